//! GPU and window context shared by every flow.

use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{self, CameraResources, CameraUniform, OrbitController, Projection},
    config::SceneConfig,
    data_structures::texture,
    pipelines::{
        Pipelines,
        light::{LightResources, LightUniform},
    },
    resources::light_helper_model,
};

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
    pub scene: SceneConfig,
}

impl Context {
    pub async fn new(window: Arc<Window>, scene: SceneConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No GPU adapter can present to this window")?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .context("Cannot open the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders light in linear space and rely on an sRGB surface to encode
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("Surface reports no texture formats")?;
        let alpha_mode = if scene.window.alpha
            && surface_caps
                .alpha_modes
                .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let cam = &scene.camera;
        let camera = camera::Camera::new(cam.position, cam.target);
        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(cam.fov_degrees),
            cam.near,
            cam.far,
        );
        let controller = OrbitController::new(&scene.controls, config.height);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let helper = (scene.point_light.helper_size > 0.0)
            .then(|| light_helper_model(&device, scene.point_light.helper_size));
        let light = LightResources::new(LightUniform::from_config(&scene), helper, &device);

        let pipelines = Pipelines::new(
            &device,
            &config,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        let clear_colour = clear_colour(scene.window.alpha);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            clear_colour,
            scene,
        })
    }

    /// Follow a new window size. Zero-sized windows (minimized) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let Some((width, height)) = surface_size(width, height) else {
            return false;
        };
        self.config.width = width;
        self.config.height = height;
        self.projection.resize(width, height);
        self.camera.controller.set_viewport_height(height);
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            texture::Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        true
    }

    /// Upload the camera and light uniforms.
    pub(crate) fn write_uniforms(&mut self) {
        self.camera
            .uniform
            .update_view_proj(&self.camera.camera, &self.projection);
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );
        self.light.write_to_buffer(&self.queue);
    }
}

/// Transparent black for a composited (alpha) window, opaque black otherwise.
pub fn clear_colour(alpha: bool) -> wgpu::Color {
    if alpha {
        wgpu::Color::TRANSPARENT
    } else {
        wgpu::Color::BLACK
    }
}

/// A surface can only be configured with a non-zero area.
pub(crate) fn surface_size(width: u32, height: u32) -> Option<(u32, u32)> {
    (width > 0 && height > 0).then_some((width, height))
}

/// What a flow constructor gets to build its GPU resources with.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub scene: SceneConfig,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        // Device and Queue are internally reference counted
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            scene: ctx.scene.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_window_clears_to_transparent() {
        assert_eq!(clear_colour(true), wgpu::Color::TRANSPARENT);
        assert_eq!(clear_colour(true).a, 0.0);
        assert_eq!(clear_colour(false), wgpu::Color::BLACK);
        assert_eq!(clear_colour(false).a, 1.0);
    }

    #[test]
    fn minimized_sizes_are_ignored() {
        assert_eq!(surface_size(0, 720), None);
        assert_eq!(surface_size(1280, 0), None);
        assert_eq!(surface_size(0, 0), None);
        assert_eq!(surface_size(1280, 720), Some((1280, 720)));
    }
}
