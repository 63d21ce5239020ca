use cgmath::Vector3;
use instant::Instant;

use crate::config::OrbitConfig;

/// Time-parameterized path of the point light around the globe.
///
/// The light circles the Y axis with period `2π·horizontal_period_ms` and
/// bobs up and down with period `2π·vertical_period_ms`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightOrbit {
    pub radius: f64,
    pub horizontal_period_ms: f64,
    pub vertical_period_ms: f64,
}

impl LightOrbit {
    pub fn position_at(&self, t_ms: f64) -> Vector3<f32> {
        let h = t_ms / self.horizontal_period_ms;
        let v = t_ms / self.vertical_period_ms;
        Vector3::new(
            (self.radius * h.sin()) as f32,
            (self.radius * v.sin()) as f32,
            (self.radius * h.cos()) as f32,
        )
    }
}

impl From<&OrbitConfig> for LightOrbit {
    fn from(config: &OrbitConfig) -> Self {
        Self {
            radius: config.radius as f64,
            horizontal_period_ms: config.horizontal_period_ms as f64,
            vertical_period_ms: config.vertical_period_ms as f64,
        }
    }
}

impl Default for LightOrbit {
    fn default() -> Self {
        (&OrbitConfig::default()).into()
    }
}

/// Milliseconds since the clock was started, read once per frame.
#[derive(Debug, Clone, Copy)]
pub struct AnimationClock {
    start: Instant,
}

impl AnimationClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn starts_in_front_of_the_globe() {
        let p = LightOrbit::default().position_at(0.0);
        assert_eq!(p, Vector3::new(0.0, 0.0, 200.0));
    }

    #[test]
    fn quarter_turn_reaches_the_x_axis() {
        let orbit = LightOrbit::default();
        let p = orbit.position_at(500.0 * PI / 2.0);
        assert_relative_eq!(p.x, 200.0, epsilon = 1e-3);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-3);
        // the vertical wave runs at half speed
        assert_relative_eq!(p.y, 200.0 * (PI / 4.0).sin() as f32, epsilon = 1e-3);
    }

    #[test]
    fn horizontal_distance_is_constant() {
        let orbit = LightOrbit::default();
        for t in [1.0, 17.0, 333.3, 10_000.0, 1.7e12] {
            let p = orbit.position_at(t);
            assert_relative_eq!((p.x * p.x + p.z * p.z).sqrt(), 200.0, epsilon = 1e-2);
            assert!(p.y.abs() <= 200.0);
        }
    }

    #[test]
    fn configured_radius_and_periods_are_used() {
        let orbit = LightOrbit::from(&OrbitConfig {
            radius: 50.0,
            horizontal_period_ms: 100.0,
            vertical_period_ms: 100.0,
        });
        let p = orbit.position_at(100.0 * PI / 2.0);
        assert_relative_eq!(p.x, 50.0, epsilon = 1e-4);
        assert_relative_eq!(p.y, 50.0, epsilon = 1e-4);
    }

    #[test]
    fn clock_is_monotonic() {
        let clock = AnimationClock::start();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(a >= 0.0 && b >= a);
    }
}
