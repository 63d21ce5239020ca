use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{self, Vertex},
        texture::Texture,
    },
    resources::texture::diffuse_normal_layout,
};

/// Lit, textured pipeline used for the globe.
pub fn mk_basic_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Render Pipeline Layout"),
        bind_group_layouts: &[
            Some(&diffuse_normal_layout(device)),
            Some(camera_bind_group_layout),
            Some(light_bind_group_layout),
        ],
        immediate_size: 0,
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Globe Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("globe.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        PipelineTargets {
            label: "Globe Pipeline",
            color_format: config.format,
            depth_format: Some(Texture::DEPTH_FORMAT),
            cull_mode: Some(wgpu::Face::Back),
        },
        &[model::ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}

/// Output formats and rasterizer settings that differ between pipelines.
/// Colour is written opaque with `REPLACE` blending in every pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTargets<'a> {
    pub label: &'a str,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub cull_mode: Option<wgpu::Face>,
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    targets: PipelineTargets,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(targets.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: targets.color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            // sphere indices wind counter-clockwise seen from outside
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: targets.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: targets.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(true),
            depth_compare: Some(wgpu::CompareFunction::Less),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
    })
}
