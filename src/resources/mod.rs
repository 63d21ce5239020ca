/**
 * Loading and creating GPU resources: asset bytes, textures, meshes and the
 * time source that drives the light animation.
 */
pub mod animation;
pub mod mesh;
pub mod texture;

use crate::data_structures::{
    model::{self, Model},
    sphere::SphereGeometry,
    texture::Texture,
};

/// The textured globe: one sphere mesh and one material.
pub async fn load_globe_model(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    geometry: &SphereGeometry,
    texture_file: &str,
) -> Model {
    let layout = texture::diffuse_normal_layout(device);
    let diffuse = texture::load_texture_or_placeholder(texture_file, device, queue).await;
    let normal = Texture::flat_normal_map(device, queue);
    let material = model::Material::new(device, texture_file, diffuse, normal, &layout);
    let mesh = mesh::upload_sphere(device, "globe", geometry, 0);
    Model {
        meshes: vec![mesh],
        materials: vec![material],
    }
}

/// Marker geometry for the point light. Drawn unlit, so it carries no material.
pub fn light_helper_model(device: &wgpu::Device, size: f32) -> Model {
    let geometry = SphereGeometry::new(size, 8, 4);
    Model {
        meshes: vec![mesh::upload_sphere(device, "point light helper", &geometry, 0)],
        materials: Vec::new(),
    }
}
