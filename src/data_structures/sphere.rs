//! UV sphere tessellation.
//!
//! Vertices are laid out on a `(width_segments + 1) × (height_segments + 1)`
//! grid from the north pole (row 0) to the south pole (last row). The first
//! and last column share positions so the texture seam gets its own UVs.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::ModelVertex;

pub const MIN_WIDTH_SEGMENTS: u32 = 3;
pub const MIN_HEIGHT_SEGMENTS: u32 = 2;

#[derive(Debug, Clone)]
pub struct SphereGeometry {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl SphereGeometry {
    pub fn new(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(MIN_WIDTH_SEGMENTS);
        let height_segments = height_segments.max(MIN_HEIGHT_SEGMENTS);

        let mut vertices =
            Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            // Pole vertices sit in the middle of their segment so each
            // pole triangle samples its own column of the texture.
            let u_offset = if iy == 0 {
                0.5 / width_segments as f32
            } else if iy == height_segments {
                -0.5 / width_segments as f32
            } else {
                0.0
            };
            let theta = v * PI;
            let (sin_theta, cos_theta) = theta.sin_cos();

            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let phi = u * 2.0 * PI;
                let (sin_phi, cos_phi) = phi.sin_cos();

                let position = Vector3::new(
                    -radius * cos_phi * sin_theta,
                    radius * cos_theta,
                    radius * sin_phi * sin_theta,
                );
                let normal = Vector3::new(-cos_phi * sin_theta, cos_theta, sin_phi * sin_theta)
                    .normalize();
                // d(position)/d(phi) without the sin(theta) factor, so it
                // stays defined at the poles
                let tangent = Vector3::new(sin_phi, 0.0, cos_phi);
                let bitangent = normal.cross(tangent);

                vertices.push(ModelVertex {
                    position: position.into(),
                    tex_coords: [u + u_offset, v],
                    normal: normal.into(),
                    tangent: tangent.into(),
                    bitangent: bitangent.into(),
                });
            }
        }

        let row = width_segments + 1;
        let mut indices = Vec::with_capacity((6 * width_segments * (height_segments - 1)) as usize);
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;

                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self {
            radius,
            width_segments,
            height_segments,
            vertices,
            indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn globe_counts() {
        let sphere = SphereGeometry::new(100.0, 64, 32);
        assert_eq!(sphere.vertices.len(), 65 * 33);
        assert_eq!(sphere.indices.len(), 6 * 64 * 31);
    }

    #[test]
    fn segments_are_clamped() {
        let sphere = SphereGeometry::new(1.0, 0, 0);
        assert_eq!(sphere.width_segments, MIN_WIDTH_SEGMENTS);
        assert_eq!(sphere.height_segments, MIN_HEIGHT_SEGMENTS);
        assert_eq!(sphere.indices.len(), 6 * 3);
    }

    #[test]
    fn vertices_lie_on_the_surface() {
        let sphere = SphereGeometry::new(100.0, 16, 8);
        for vertex in &sphere.vertices {
            let p: Vector3<f32> = vertex.position.into();
            let n: Vector3<f32> = vertex.normal.into();
            assert_relative_eq!(p.magnitude(), 100.0, epsilon = 1e-3);
            assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-5);
            assert_relative_eq!((p / 100.0 - n).magnitude(), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn poles_are_on_the_y_axis() {
        let sphere = SphereGeometry::new(100.0, 16, 8);
        let north = sphere.vertices.first().unwrap();
        let south = sphere.vertices.last().unwrap();
        assert_relative_eq!(north.position[1], 100.0, epsilon = 1e-4);
        assert_relative_eq!(south.position[1], -100.0, epsilon = 1e-4);
        assert_eq!(north.tex_coords[1], 0.0);
        assert_eq!(south.tex_coords[1], 1.0);
    }

    #[test]
    fn indices_are_in_range() {
        let sphere = SphereGeometry::new(1.0, 12, 6);
        let len = sphere.vertices.len() as u32;
        assert!(sphere.indices.iter().all(|&i| i < len));
        assert_eq!(sphere.indices.len() % 3, 0);
    }

    #[test]
    fn triangles_face_outwards() {
        let sphere = SphereGeometry::new(1.0, 12, 6);
        for tri in sphere.indices.chunks(3) {
            let p = |i: u32| Vector3::from(sphere.vertices[i as usize].position);
            let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
            let face_normal = (b - a).cross(c - a);
            let centre = (a + b + c) / 3.0;
            assert!(face_normal.dot(centre) > 0.0);
        }
    }

    #[test]
    fn tangent_frame_is_orthonormal() {
        let sphere = SphereGeometry::new(5.0, 8, 4);
        for vertex in &sphere.vertices {
            let n = Vector3::from(vertex.normal);
            let t = Vector3::from(vertex.tangent);
            let b = Vector3::from(vertex.bitangent);
            assert_relative_eq!(t.magnitude(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(n.dot(t), 0.0, epsilon = 1e-5);
            assert_relative_eq!(n.dot(b), 0.0, epsilon = 1e-5);
        }
    }
}
