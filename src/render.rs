//! Render composition.
//!
//! Flows describe what they want drawn each frame with a [`Render`]. The
//! engine collects the renders of all flows into one batch for the textured
//! pipeline.

use crate::data_structures::model::Model;

/// A model drawn with GPU instancing: one vertex buffer of instance data,
/// `amount` instances.
#[derive(Clone, Copy)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// Specifies how a flow should be rendered.
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders one textured, lit object
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
}

impl<'a> Render<'a> {
    /// Append the instanced draws of this render to `batch`.
    pub(crate) fn collect(self, batch: &mut Vec<Instanced<'a>>) {
        match self {
            Render::Default(instanced) => batch.push(instanced),
            Render::None => (),
        }
    }
}
