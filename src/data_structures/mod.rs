//! Engine data structures: meshes, materials, textures and instances.
//!
//! - `model` contains mesh and material definitions plus the draw helpers
//! - `sphere` tessellates UV spheres on the CPU
//! - `texture` wraps GPU textures (depth buffer, colour maps, flat fills)
//! - `instance` holds per-instance transformation data

pub mod instance;
pub mod model;
pub mod sphere;
pub mod texture;
