use std::path::Path;

use anyhow::Context as _;
use orbit_globe::{SceneConfig, flow, globe};

const DEFAULT_CONFIG: &str = "scene.toml";

/// Scene from the path given on the command line, else `scene.toml` when it
/// exists, else the built-in defaults.
fn load_scene() -> anyhow::Result<SceneConfig> {
    match std::env::args().nth(1) {
        Some(path) => SceneConfig::load(&path).with_context(|| format!("Cannot load {}", path)),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            SceneConfig::load(DEFAULT_CONFIG).with_context(|| format!("Cannot load {}", DEFAULT_CONFIG))
        }
        None => Ok(SceneConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    flow::init_logging();
    let scene = load_scene()?;
    log::info!("Starting \"{}\"", scene.window.title);
    flow::run::<()>(scene, vec![globe::globe_constructor()])
}
