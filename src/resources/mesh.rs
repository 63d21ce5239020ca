use wgpu::util::DeviceExt;

use crate::data_structures::{model, sphere::SphereGeometry};

/**
 * Copies CPU-side sphere geometry into vertex and index buffers.
 *
 * `material` indexes into the `materials` of the model the mesh ends up in.
 */
pub fn upload_sphere(
    device: &wgpu::Device,
    name: &str,
    geometry: &SphereGeometry,
    material: usize,
) -> model::Mesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Vertex Buffer", name)),
        contents: bytemuck::cast_slice(&geometry.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Index Buffer", name)),
        contents: bytemuck::cast_slice(&geometry.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    log::debug!(
        "{}: {} vertices, {} triangles",
        name,
        geometry.vertices.len(),
        geometry.indices.len() / 3
    );

    model::Mesh {
        name: name.to_string(),
        vertex_buffer,
        index_buffer,
        num_elements: geometry.indices.len() as u32,
        material,
    }
}
