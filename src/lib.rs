//! orbit-globe
//!
//! A textured earth at the origin, lit by a directional light and a point light
//! that circles it, viewed through an orbit camera. Runs natively and
//! in the browser through WebGL.
//!
//! High-level modules
//! - `camera`: perspective camera, orbit controls and the camera uniform
//! - `config`: TOML scene configuration with validated defaults
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: sphere geometry, meshes, instances and textures
//! - `flow`: the event loop and the `GraphicsFlow` lifecycle
//! - `globe`: the globe flow with its animated light
//! - `pipelines`: the lit globe pipeline and the light marker pipeline
//! - `resources`: asset loading, GPU uploads and the light animation
//! - `render`: render composition for the frame
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod globe;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use config::{ConfigError, SceneConfig};
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point. Runs once the module is loaded, which happens after
/// the page's `load` event, so the canvas already exists.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    flow::run::<()>(SceneConfig::default(), vec![globe::globe_constructor()])
        .map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
