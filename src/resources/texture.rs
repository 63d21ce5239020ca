use crate::data_structures::texture;

pub fn diffuse_normal_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("diffuse_normal_bind_group_layout"),
    })
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page has no origin"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url).await?.error_for_status()?;
        response.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?
    };

    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str());
    texture::Texture::from_bytes(device, queue, &data, file_name, extension, is_normal_map)
}

/// Load a colour map, falling back to [`placeholder_globe`] when the file is
/// missing or cannot be decoded so the scene still has something to show.
pub async fn load_texture_or_placeholder(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> texture::Texture {
    match load_texture(file_name, false, device, queue).await {
        Ok(texture) => {
            log::info!("Loaded texture {}", file_name);
            texture
        }
        Err(e) => {
            log::warn!("Texture {} unavailable ({:#}), using a placeholder", file_name, e);
            let image = placeholder_globe(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT);
            texture::Texture::from_rgba(device, queue, &image, Some("placeholder globe"), true)
        }
    }
}

pub const PLACEHOLDER_WIDTH: u32 = 256;
pub const PLACEHOLDER_HEIGHT: u32 = 128;

const OCEAN: [u8; 4] = [28, 78, 150, 255];
const ICE: [u8; 4] = [236, 242, 248, 255];
const GRID: [u8; 4] = [120, 170, 220, 255];

/// Equirectangular stand-in for a globe texture: ocean, polar caps above 70°
/// latitude and a 30° graticule.
pub fn placeholder_globe(width: u32, height: u32) -> image::RgbaImage {
    let width = width.max(1);
    let height = height.max(1);
    image::RgbaImage::from_fn(width, height, |x, y| {
        let lon = (x as f32 + 0.5) / width as f32 * 360.0;
        let lat = 90.0 - (y as f32 + 0.5) / height as f32 * 180.0;
        let near_line = |deg: f32, step_px: f32| {
            let rem = deg.rem_euclid(30.0);
            rem.min(30.0 - rem) <= step_px / 2.0
        };
        let px_lon = 360.0 / width as f32;
        let px_lat = 180.0 / height as f32;
        if lat.abs() > 70.0 {
            image::Rgba(ICE)
        } else if near_line(lon, px_lon) || near_line(lat, px_lat) {
            image::Rgba(GRID)
        } else {
            image::Rgba(OCEAN)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_has_requested_size() {
        let img = placeholder_globe(64, 32);
        assert_eq!(img.dimensions(), (64, 32));
        assert_eq!(placeholder_globe(0, 0).dimensions(), (1, 1));
    }

    #[test]
    fn placeholder_poles_are_ice() {
        let img = placeholder_globe(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT);
        assert_eq!(img.get_pixel(10, 0).0, ICE);
        assert_eq!(img.get_pixel(10, PLACEHOLDER_HEIGHT - 1).0, ICE);
    }

    #[test]
    fn placeholder_has_ocean_and_graticule() {
        let img = placeholder_globe(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT);
        let pixels: Vec<[u8; 4]> = img.pixels().map(|p| p.0).collect();
        assert!(pixels.contains(&OCEAN));
        assert!(pixels.contains(&GRID));
        // the first column sits on the prime meridian
        assert_eq!(img.get_pixel(0, PLACEHOLDER_HEIGHT / 2 + 5).0, GRID);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn missing_asset_is_an_error() {
        assert!(load_binary("textures/definitely-missing.jpg").await.is_err());
    }
}
