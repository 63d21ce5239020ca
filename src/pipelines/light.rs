use cgmath::InnerSpace;
use wgpu::util::DeviceExt;

use crate::{
    config::{SceneConfig, hex_to_linear_rgb},
    pipelines::basic::{PipelineTargets, mk_render_pipeline},
    data_structures::{
        model::{Model, ModelVertex, Vertex},
        texture,
    },
};

/// Both scene lights as seen by the shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub point_position: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    /// Colour premultiplied with intensity.
    pub point_color: [f32; 3],
    _padding2: u32,
    /// Unit vector from the scene towards the directional light.
    pub directional_direction: [f32; 3],
    _padding3: u32,
    pub directional_color: [f32; 3],
    _padding4: u32,
}

impl LightUniform {
    pub fn new(
        point_position: [f32; 3],
        point_color: [f32; 3],
        directional_position: [f32; 3],
        directional_color: [f32; 3],
    ) -> Self {
        let direction = cgmath::Vector3::from(directional_position);
        let direction = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            cgmath::Vector3::unit_y()
        };
        Self {
            point_position,
            _padding: 0,
            point_color,
            _padding2: 0,
            directional_direction: direction.into(),
            _padding3: 0,
            directional_color,
            _padding4: 0,
        }
    }

    pub fn from_config(config: &SceneConfig) -> Self {
        let scaled = |hex: u32, intensity: f32| hex_to_linear_rgb(hex).map(|c| c * intensity);
        Self::new(
            config.point_light.position,
            scaled(config.point_light.color, config.point_light.intensity),
            config.directional_light.position,
            scaled(config.directional_light.color, config.directional_light.intensity),
        )
    }
}

/// Light uniform on the GPU plus the optional marker drawn at the point light.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub helper: Option<Model>,
}

impl LightResources {
    pub fn new(uniform: LightUniform, helper: Option<Model>, device: &wgpu::Device) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
            helper,
        }
    }

    pub fn set_point_position(&mut self, position: cgmath::Vector3<f32>) {
        self.uniform.point_position = position.into();
    }

    pub fn write_to_buffer(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

/// Unlit pipeline for the point light marker.
pub fn mk_light_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Light Pipeline Layout"),
        bind_group_layouts: &[Some(camera_bind_group_layout), Some(light_bind_group_layout)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Light Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("light.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        PipelineTargets {
            label: "Light Marker Pipeline",
            color_format: config.format,
            depth_format: Some(texture::Texture::DEPTH_FORMAT),
            // the marker is tiny and unlit, both faces may show
            cull_mode: None,
        },
        &[ModelVertex::desc()],
        shader,
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 64);
        assert_eq!(std::mem::size_of::<LightUniform>() % 16, 0);
    }

    #[test]
    fn default_scene_lights() {
        let uniform = LightUniform::from_config(&SceneConfig::default());
        assert_eq!(uniform.point_position, [-200.0, -200.0, -200.0]);
        assert_eq!(uniform.point_color, [1.0, 1.0, 1.0]);
        assert_eq!(uniform.directional_color, [2.0, 2.0, 2.0]);
        let inv_sqrt3 = 1.0 / 3.0_f32.sqrt();
        for c in uniform.directional_direction {
            assert_relative_eq!(c, inv_sqrt3, epsilon = 1e-6);
        }
    }

    #[test]
    fn zero_direction_points_up() {
        let uniform = LightUniform::new([0.0; 3], [1.0; 3], [0.0; 3], [1.0; 3]);
        assert_eq!(uniform.directional_direction, [0.0, 1.0, 0.0]);
    }
}
