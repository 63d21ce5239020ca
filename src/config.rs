//! Scene configuration.
//!
//! Every value of the scene can be overridden from a TOML file. Missing
//! sections and fields fall back to the defaults below: a radius-100 earth
//! seen from 500 units away, with a white light circling it.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub globe: GlobeConfig,
    pub directional_light: DirectionalLightConfig,
    pub point_light: PointLightConfig,
    pub orbit: OrbitConfig,
    pub controls: ControlsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Clear to transparent black instead of opaque black.
    pub alpha: bool,
    /// Reconfigure the surface and projection when the window is resized.
    pub follow_resize: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "orbit-globe".to_string(),
            width: 1280,
            height: 720,
            alpha: true,
            follow_resize: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 50.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 500.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    /// Path relative to the asset directory.
    pub texture: String,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            radius: 100.0,
            width_segments: 64,
            height_segments: 32,
            texture: "textures/earth.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightConfig {
    /// 0xRRGGBB in sRGB
    pub color: u32,
    pub intensity: f32,
    /// The light shines from this position towards the origin.
    pub position: [f32; 3],
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 2.0,
            position: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointLightConfig {
    /// 0xRRGGBB in sRGB
    pub color: u32,
    pub intensity: f32,
    /// Initial uniform value. The globe flow moves the light onto its orbit
    /// in its first update, so this only shows in scenes without that flow.
    pub position: [f32; 3],
    /// Radius of the marker drawn at the light position. Zero hides it.
    pub helper_size: f32,
}

impl Default for PointLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 1.0,
            position: [-200.0, -200.0, -200.0],
            helper_size: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub radius: f32,
    pub horizontal_period_ms: f32,
    pub vertical_period_ms: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            radius: 200.0,
            horizontal_period_ms: 500.0,
            vertical_period_ms: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// `None` applies input immediately, `Some(f)` eases it in with factor `f`.
    pub damping_factor: Option<f32>,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 110.0,
            max_distance: 900.0,
            damping_factor: None,
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_finite()?;

        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(invalid("camera.fov_degrees", "must be within (0, 180)"));
        }
        if camera.near <= 0.0 {
            return Err(invalid("camera.near", "must be positive"));
        }
        if camera.near >= camera.far {
            return Err(invalid("camera.far", "must be greater than camera.near"));
        }
        if camera.position == camera.target {
            return Err(invalid("camera.position", "must differ from camera.target"));
        }

        let globe = &self.globe;
        if globe.radius <= 0.0 {
            return Err(invalid("globe.radius", "must be positive"));
        }
        if globe.width_segments == 0 || globe.height_segments == 0 {
            return Err(invalid("globe.width_segments", "segments must be non-zero"));
        }

        if self.orbit.horizontal_period_ms <= 0.0 || self.orbit.vertical_period_ms <= 0.0 {
            return Err(invalid("orbit", "periods must be positive"));
        }
        if self.orbit.radius <= 0.0 {
            return Err(invalid("orbit.radius", "must be positive"));
        }

        let controls = &self.controls;
        if controls.min_distance <= 0.0 || controls.min_distance > controls.max_distance {
            return Err(invalid(
                "controls.min_distance",
                "must be positive and not exceed controls.max_distance",
            ));
        }
        if let Some(f) = controls.damping_factor {
            if !(f > 0.0 && f <= 1.0) {
                return Err(invalid("controls.damping_factor", "must be within (0, 1]"));
            }
        }

        if self.directional_light.intensity < 0.0 || self.point_light.intensity < 0.0 {
            return Err(invalid("intensity", "light intensities must not be negative"));
        }
        if self.point_light.helper_size < 0.0 {
            return Err(invalid("point_light.helper_size", "must not be negative"));
        }
        Ok(())
    }

    /// NaN and infinities compare false against every bound, so they are
    /// rejected up front.
    fn check_finite(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        let controls = &self.controls;
        let scalars: [(&'static str, f32); 16] = [
            ("camera.fov_degrees", camera.fov_degrees),
            ("camera.near", camera.near),
            ("camera.far", camera.far),
            ("globe.radius", self.globe.radius),
            ("directional_light.intensity", self.directional_light.intensity),
            ("point_light.intensity", self.point_light.intensity),
            ("point_light.helper_size", self.point_light.helper_size),
            ("orbit.radius", self.orbit.radius),
            ("orbit.horizontal_period_ms", self.orbit.horizontal_period_ms),
            ("orbit.vertical_period_ms", self.orbit.vertical_period_ms),
            ("controls.rotate_speed", controls.rotate_speed),
            ("controls.zoom_speed", controls.zoom_speed),
            ("controls.pan_speed", controls.pan_speed),
            ("controls.min_distance", controls.min_distance),
            ("controls.max_distance", controls.max_distance),
            ("controls.damping_factor", controls.damping_factor.unwrap_or(1.0)),
        ];
        let vectors: [(&'static str, [f32; 3]); 4] = [
            ("camera.position", camera.position),
            ("camera.target", camera.target),
            ("directional_light.position", self.directional_light.position),
            ("point_light.position", self.point_light.position),
        ];
        let not_finite = scalars
            .into_iter()
            .find(|(_, v)| !v.is_finite())
            .map(|(field, _)| field)
            .or_else(|| {
                vectors
                    .into_iter()
                    .find(|(_, v)| v.iter().any(|c| !c.is_finite()))
                    .map(|(field, _)| field)
            });
        match not_finite {
            Some(field) => Err(invalid(field, "must be a finite number")),
            None => Ok(()),
        }
    }
}

/// Convert a 0xRRGGBB sRGB colour to linear RGB, the space the shaders light in.
pub fn hex_to_linear_rgb(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn defaults_describe_the_globe_demo() {
        let config = SceneConfig::default();
        assert_eq!(config.camera.fov_degrees, 50.0);
        assert_eq!(config.camera.far, 1000.0);
        assert_eq!(config.camera.position, [0.0, 0.0, 500.0]);
        assert_eq!(config.globe.radius, 100.0);
        assert_eq!((config.globe.width_segments, config.globe.height_segments), (64, 32));
        assert_eq!(config.directional_light.intensity, 2.0);
        assert_eq!(config.point_light.position, [-200.0, -200.0, -200.0]);
        assert_eq!(config.orbit.radius, 200.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = SceneConfig::from_toml_str(
            r#"
            [camera]
            far = 2000.0

            [point_light]
            helper_size = 0.0
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.far, 2000.0);
        assert_eq!(config.camera.fov_degrees, 50.0);
        assert_eq!(config.point_light.helper_size, 0.0);
        assert_eq!(config.point_light.intensity, 1.0);
        assert_eq!(config.globe, GlobeConfig::default());
    }

    #[test]
    fn empty_toml_is_the_default_scene() {
        assert_eq!(SceneConfig::from_toml_str("").unwrap(), SceneConfig::default());
    }

    #[test]
    fn near_plane_behind_far_plane_is_rejected() {
        let err = SceneConfig::from_toml_str("[camera]\nnear = 10.0\nfar = 5.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "camera.far", .. }));
    }

    #[test]
    fn zero_period_is_rejected() {
        let err = SceneConfig::from_toml_str("[orbit]\nhorizontal_period_ms = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "orbit", .. }));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        for (text, field) in [
            ("[controls]\nmin_distance = nan\n", "controls.min_distance"),
            ("[controls]\nmax_distance = nan\n", "controls.max_distance"),
            ("[controls]\nmax_distance = inf\n", "controls.max_distance"),
            ("[camera]\nnear = nan\n", "camera.near"),
            ("[camera]\nfar = inf\n", "camera.far"),
            ("[camera]\nposition = [0.0, nan, 500.0]\n", "camera.position"),
            ("[orbit]\nvertical_period_ms = -inf\n", "orbit.vertical_period_ms"),
            ("[controls]\ndamping_factor = nan\n", "controls.damping_factor"),
        ] {
            match SceneConfig::from_toml_str(text) {
                Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, field, "{text}"),
                other => panic!("{text:?} should be invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn orbit_needs_a_positive_radius() {
        let err = SceneConfig::from_toml_str("[orbit]\nradius = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "orbit.radius", .. }));
        let err = SceneConfig::from_toml_str("[point_light]\nhelper_size = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "point_light.helper_size", .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SceneConfig::from_toml_str("[camera\nfar = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialized_config_reads_back() {
        let mut config = SceneConfig::default();
        config.controls.damping_factor = Some(0.05);
        config.window.alpha = false;
        let text = config.to_toml_string().unwrap();
        assert_eq!(SceneConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SceneConfig::load("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn hex_colours_are_linearized() {
        assert_eq!(hex_to_linear_rgb(0xffffff), [1.0, 1.0, 1.0]);
        assert_eq!(hex_to_linear_rgb(0x000000), [0.0, 0.0, 0.0]);
        let [r, g, b] = hex_to_linear_rgb(0xff8000);
        assert_eq!(r, 1.0);
        assert_relative_eq!(g, 0.2158605, epsilon = 1e-4);
        assert_eq!(b, 0.0);
    }
}
