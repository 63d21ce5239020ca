//! Perspective camera, projection and mouse-driven orbit controls.
//!
//! The camera always looks at a target point. [`OrbitController`] turns
//! pointer input into rotation around that target (left drag), panning of the
//! target (right drag) and dolly in/out (mouse wheel). Input is accumulated
//! between frames and applied once per frame in [`OrbitController::update_camera`].

use std::f32::consts::{FRAC_PI_2, PI};

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector2, Vector3, perspective};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::config::ControlsConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Keeps the polar angle away from the poles so `look_at` never sees a view
// direction parallel to `up`.
const POLAR_EPSILON: f32 = 0.001;

/// Pixels of wheel movement that count as one scroll line.
const PIXELS_PER_LINE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// Distance between the eye and the point it orbits.
    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// View/projection data as laid out in the shaders' camera uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        // w = 1 marks a point rather than a direction
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the camera plus the controller that moves it.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    None,
    Rotate,
    Pan,
}

/// Orbit-style camera manipulator.
///
/// Angles follow the usual spherical convention: `theta` is the azimuth
/// around +Y measured from +Z, `phi` is the polar angle measured from +Y.
#[derive(Debug, Clone)]
pub struct OrbitController {
    rotate_speed: f32,
    zoom_speed: f32,
    pan_speed: f32,
    min_distance: f32,
    max_distance: f32,
    damping: Option<f32>,
    drag: Drag,
    cursor: Option<PhysicalPosition<f64>>,
    viewport_height: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan: Vector2<f32>,
}

impl OrbitController {
    pub fn new(controls: &ControlsConfig, viewport_height: u32) -> Self {
        Self {
            rotate_speed: controls.rotate_speed,
            zoom_speed: controls.zoom_speed,
            pan_speed: controls.pan_speed,
            min_distance: controls.min_distance,
            max_distance: controls.max_distance,
            damping: controls.damping_factor,
            drag: Drag::None,
            cursor: None,
            viewport_height: viewport_height.max(1) as f32,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan: Vector2::new(0.0, 0.0),
        }
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Rotate by a pointer movement in pixels. A drag across the full
    /// viewport height turns the camera by one full revolution.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let per_pixel = 2.0 * PI * self.rotate_speed / self.viewport_height;
        self.delta_theta -= dx * per_pixel;
        self.delta_phi -= dy * per_pixel;
    }

    /// Pan by a pointer movement in pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan.x += dx * self.pan_speed;
        self.pan.y += dy * self.pan_speed;
    }

    /// Dolly by scroll lines; positive values move the camera closer.
    pub fn zoom(&mut self, lines: f32) {
        let step = 0.95_f32.powf(self.zoom_speed);
        self.scale *= step.powf(lines);
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (button, state) {
                    (MouseButton::Left, ElementState::Pressed) => Drag::Rotate,
                    (MouseButton::Right, ElementState::Pressed)
                    | (MouseButton::Middle, ElementState::Pressed) => Drag::Pan,
                    (_, ElementState::Released) => Drag::None,
                    _ => self.drag,
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(last) = self.cursor {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    match self.drag {
                        Drag::Rotate => self.rotate(dx, dy),
                        Drag::Pan => self.pan(dx, dy),
                        Drag::None => (),
                    }
                }
                self.cursor = Some(*position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = Drag::None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.zoom(lines);
            }
            _ => (),
        }
    }

    /// Apply the accumulated input to `camera`.
    pub fn update_camera(&mut self, camera: &mut Camera, fovy: Rad<f32>) {
        let offset = camera.position - camera.target;
        let radius = offset.magnitude();
        if radius <= f32::EPSILON {
            self.reset_pending();
            return;
        }

        let factor = self.damping.unwrap_or(1.0);

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        theta += self.delta_theta * factor;
        phi = (phi + self.delta_phi * factor).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        // pan distance in world units per pixel at the target's depth
        let world_per_pixel = 2.0 * radius * (fovy.0 / 2.0).min(FRAC_PI_2 - POLAR_EPSILON).tan()
            / self.viewport_height;
        let forward = (camera.target - camera.position).normalize();
        let right = forward.cross(camera.up).normalize();
        let up = right.cross(forward);
        let shift = (-right * self.pan.x + up * self.pan.y) * world_per_pixel * factor;

        camera.target += shift;
        camera.position = camera.target
            + Vector3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );

        match self.damping {
            Some(damping) => {
                self.delta_theta *= 1.0 - damping;
                self.delta_phi *= 1.0 - damping;
                self.pan *= 1.0 - damping;
            }
            None => {
                self.delta_theta = 0.0;
                self.delta_phi = 0.0;
                self.pan = Vector2::new(0.0, 0.0);
            }
        }
        self.scale = 1.0;
    }

    fn reset_pending(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
        self.pan = Vector2::new(0.0, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::Deg;

    use super::*;

    fn controller() -> OrbitController {
        OrbitController::new(&ControlsConfig::default(), 600)
    }

    fn camera() -> Camera {
        Camera::new((0.0, 0.0, 500.0), (0.0, 0.0, 0.0))
    }

    #[test]
    fn rotation_keeps_distance_to_target() {
        let mut ctrl = controller();
        let mut cam = camera();
        ctrl.rotate(120.0, -45.0);
        ctrl.update_camera(&mut cam, Deg(50.0).into());
        assert_relative_eq!(cam.distance(), 500.0, epsilon = 1e-2);
        assert_ne!(cam.position, camera().position);
    }

    #[test]
    fn full_viewport_drag_is_a_full_turn() {
        let mut ctrl = controller();
        let mut cam = camera();
        ctrl.rotate(600.0, 0.0);
        ctrl.update_camera(&mut cam, Deg(50.0).into());
        assert_relative_eq!(cam.position.x, 0.0, epsilon = 1e-2);
        assert_relative_eq!(cam.position.z, 500.0, epsilon = 1e-2);
    }

    #[test]
    fn polar_angle_never_reaches_the_pole() {
        let mut ctrl = controller();
        let mut cam = camera();
        ctrl.rotate(0.0, 10_000.0);
        ctrl.update_camera(&mut cam, Deg(50.0).into());
        let offset = cam.position - cam.target;
        let horizontal = (offset.x * offset.x + offset.z * offset.z).sqrt();
        assert!(offset.y > 0.0);
        assert!(horizontal > 0.0);
    }

    #[test]
    fn zoom_is_clamped_to_distance_limits() {
        let mut ctrl = controller();
        let mut cam = camera();
        ctrl.zoom(10_000.0);
        ctrl.update_camera(&mut cam, Deg(50.0).into());
        assert_relative_eq!(cam.distance(), ControlsConfig::default().min_distance, epsilon = 1e-3);

        ctrl.zoom(-10_000.0);
        ctrl.update_camera(&mut cam, Deg(50.0).into());
        assert_relative_eq!(cam.distance(), ControlsConfig::default().max_distance, epsilon = 1e-1);
    }

    #[test]
    fn scrolling_up_moves_closer() {
        let mut ctrl = controller();
        let mut cam = camera();
        ctrl.zoom(1.0);
        ctrl.update_camera(&mut cam, Deg(50.0).into());
        assert!(cam.distance() < 500.0);
    }

    #[test]
    fn pan_moves_eye_and_target_together() {
        let mut ctrl = controller();
        let mut cam = camera();
        ctrl.pan(30.0, 0.0);
        ctrl.update_camera(&mut cam, Deg(50.0).into());
        assert!(cam.target.x < 0.0);
        assert_relative_eq!(cam.distance(), 500.0, epsilon = 1e-2);
        assert_relative_eq!(cam.position.x, cam.target.x, epsilon = 1e-3);
    }

    #[test]
    fn pending_input_is_consumed_without_damping() {
        let mut ctrl = controller();
        let mut cam = camera();
        ctrl.rotate(50.0, 0.0);
        ctrl.update_camera(&mut cam, Deg(50.0).into());
        let after_first = cam.position;
        ctrl.update_camera(&mut cam, Deg(50.0).into());
        assert_relative_eq!(cam.position.x, after_first.x, epsilon = 1e-3);
        assert_relative_eq!(cam.position.z, after_first.z, epsilon = 1e-3);
    }

    #[test]
    fn projection_tracks_aspect_ratio() {
        let mut proj = Projection::new(800, 600, Deg(50.0), 0.1, 1000.0);
        assert_relative_eq!(proj.aspect(), 800.0 / 600.0);
        proj.resize(1920, 1080);
        assert_relative_eq!(proj.aspect(), 1920.0 / 1080.0);
        proj.resize(0, 1080);
        assert_relative_eq!(proj.aspect(), 1920.0 / 1080.0);
    }

    #[test]
    fn target_projects_to_screen_centre() {
        let cam = camera();
        let proj = Projection::new(800, 600, Deg(50.0), 0.1, 1000.0);
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&cam, &proj);
        let m: Matrix4<f32> = uniform.view_proj.into();
        let clip = m * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
        let depth = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&depth));
        assert_eq!(uniform.view_position, [0.0, 0.0, 500.0, 1.0]);
    }
}
