use approx::assert_relative_eq;
use cgmath::{Deg, InnerSpace, Vector3};
use orbit_globe::{
    SceneConfig,
    camera::{Camera, OrbitController},
    data_structures::sphere::SphereGeometry,
    resources::animation::LightOrbit,
};

#[test]
fn example_scene_file_matches_defaults() {
    let scene = SceneConfig::from_toml_str(include_str!("../scene.example.toml"))
        .expect("example scene should parse");
    assert_eq!(scene, SceneConfig::default());
}

#[test]
fn default_globe_geometry_has_expected_resolution() {
    let globe = SceneConfig::default().globe;
    let sphere = SphereGeometry::new(globe.radius, globe.width_segments, globe.height_segments);
    assert_eq!(sphere.vertices.len(), 65 * 33);
    for v in &sphere.vertices {
        assert_relative_eq!(Vector3::from(v.position).magnitude(), 100.0, epsilon = 1e-3);
    }
}

#[test]
fn light_orbit_stays_outside_the_globe() {
    let scene = SceneConfig::default();
    let orbit = LightOrbit::from(&scene.orbit);
    for step in 0..200 {
        let p = orbit.position_at(step as f64 * 37.0);
        let horizontal = (p.x * p.x + p.z * p.z).sqrt();
        assert_relative_eq!(horizontal, 200.0, epsilon = 1e-3);
        assert!(p.magnitude() > scene.globe.radius);
    }
}

#[test]
fn zooming_never_enters_the_globe() {
    let scene = SceneConfig::default();
    let mut controller = OrbitController::new(&scene.controls, scene.window.height);
    let mut camera = Camera::new(scene.camera.position, scene.camera.target);
    for _ in 0..100 {
        controller.zoom(10.0);
        controller.update_camera(&mut camera, Deg(scene.camera.fov_degrees).into());
    }
    assert_relative_eq!(camera.distance(), scene.controls.min_distance, epsilon = 1e-3);
    assert!(camera.distance() > scene.globe.radius);
}
