//! GPU textures: the depth buffer, image-backed colour maps and flat fills.

use anyhow::{Context as _, Result, anyhow};
use image::{GenericImageView, ImageFormat};

/// A GPU texture with its default view and, for sampled textures, a sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth attachment matching a surface of `size` = [width, height].
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// A normal map that leaves surface normals untouched.
    pub fn flat_normal_map(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        // (0.5, 0.5, 1.0) encodes the tangent-space vector (0, 0, 1)
        Self::solid(device, queue, [127, 127, 255, 255], "flat normal map", false)
    }

    /// A 1×1 texture filled with `rgba`.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
        srgb: bool,
    ) -> Self {
        let image = image::RgbaImage::from_pixel(1, 1, image::Rgba(rgba));
        Self::from_rgba(device, queue, &image, Some(label), srgb)
    }

    /// Decode `bytes` and upload them. `extension` is a file extension hint
    /// ("jpg", "png"); without one the format is guessed from the content.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        extension: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let img = match extension.and_then(ImageFormat::from_extension) {
            Some(format) => image::load_from_memory_with_format(bytes, format),
            None => image::load_from_memory(bytes),
        }
        .with_context(|| format!("failed to decode image {label}"))?;
        Self::from_image(device, queue, &img, Some(label), is_normal_map)
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(anyhow!("image {:?} has no pixels", label));
        }
        Ok(Self::from_rgba(device, queue, &img.to_rgba8(), label, !is_normal_map))
    }

    /// Upload an RGBA image. Colour maps are sRGB, data maps are linear.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &image::RgbaImage,
        label: Option<&str>,
        srgb: bool,
    ) -> Self {
        let (width, height) = rgba.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        }
    }
}

/// Linear filtering, wrapping horizontally so the globe seam is invisible.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}
