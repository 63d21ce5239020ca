//! Render pipelines: `basic` draws the lit, textured globe and `light` draws
//! the unlit point light marker.

pub mod basic;
pub mod light;

#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub light: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            basic: basic::mk_basic_pipeline(
                device,
                config,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
            light: light::mk_light_pipeline(
                device,
                config,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
        }
    }
}
