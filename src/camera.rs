//! Perspective camera and orbit controls.

use crate::options::{CameraOptions, ControlOptions};
use glam::{Mat4, Vec3, Vec4Swizzles};
use log::debug;
use std::f32::consts::PI;

const EPS: f32 = 1e-6;

/// Right-handed, y-up perspective camera.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Mat4,
}

/// A world point mapped to pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    /// Distance from the camera along the view axis.
    pub depth: f32,
}

impl PerspectiveCamera {
    pub fn new(options: &CameraOptions, aspect: f32) -> Self {
        let mut camera = Self {
            position: Vec3::from_array(options.position),
            target: Vec3::from_array(options.target),
            up: Vec3::Y,
            fov_y: options.fov_degrees.to_radians(),
            aspect,
            near: options.near,
            far: options.far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recomputes the projection; call after changing fov, aspect or clip planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn distance_to_target(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Projects a world-space point onto a `width` x `height` viewport.
    ///
    /// Returns `None` for points behind the near plane. Points outside the
    /// frustum sideways still project, the rasteriser clips them.
    pub fn project(&self, world: Vec3, width: u32, height: u32) -> Option<ScreenPoint> {
        let view = self.view_matrix() * world.extend(1.0);
        let depth = -view.z;
        if depth < self.near {
            return None;
        }
        let clip = self.projection * view;
        let ndc = clip.xyz() / clip.w;
        Some(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * width as f32,
            y: (1.0 - ndc.y) * 0.5 * height as f32,
            depth,
        })
    }
}

/// One unit of pointer input forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    /// Pointer drag in pixels.
    Rotate { dx: f32, dy: f32 },
    /// Wheel steps; positive moves toward the target.
    Zoom { steps: f32 },
    /// Pointer drag in pixels with the pan modifier held.
    Pan { dx: f32, dy: f32 },
}

/// Orbits the camera around a target with damped motion.
///
/// Input only accumulates deltas; [`OrbitControls::update`] applies a
/// `damping_factor` share of them each frame and decays the rest, which is
/// what keeps the view gliding after the pointer stops.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    options: ControlOptions,
    target: Vec3,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
    disposed: bool,
}

impl OrbitControls {
    pub fn new(camera: &PerspectiveCamera, options: ControlOptions) -> Self {
        Self {
            options,
            target: camera.target,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            disposed: false,
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// True while damped motion is still being applied.
    pub fn is_moving(&self) -> bool {
        self.delta_theta.abs() > EPS
            || self.delta_phi.abs() > EPS
            || self.pan_offset.length_squared() > EPS
            || (self.scale - 1.0).abs() > EPS
    }

    /// Queues input. `viewport_height` turns pixels into angles the way a
    /// full-height drag equals one turn.
    pub fn handle_input(&mut self, input: ControlInput, camera: &PerspectiveCamera, viewport_height: u32) {
        if self.disposed {
            return;
        }
        let height = viewport_height.max(1) as f32;

        match input {
            ControlInput::Rotate { dx, dy } => {
                self.delta_theta -= 2.0 * PI * dx / height * self.options.rotate_speed;
                self.delta_phi -= 2.0 * PI * dy / height * self.options.rotate_speed;
            }
            ControlInput::Zoom { steps } => {
                let zoom_scale = 0.95f32.powf(self.options.zoom_speed);
                self.scale *= zoom_scale.powf(steps);
            }
            ControlInput::Pan { dx, dy } => {
                let view = camera.view_matrix().inverse();
                let right = view.x_axis.xyz();
                let up = view.y_axis.xyz();
                let distance = camera.distance_to_target() * (camera.fov_y / 2.0).tan();
                let k = 2.0 * distance / height * self.options.pan_speed;
                self.pan_offset += -right * dx * k + up * dy * k;
            }
        }
    }

    /// Applies pending motion to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if self.disposed {
            return false;
        }

        let damping = self.options.damping_factor.clamp(0.0, 1.0);
        let share = if damping > 0.0 { damping } else { 1.0 };

        let offset = camera.position - self.target;
        let mut radius = offset.length().max(EPS);
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        theta += self.delta_theta * share;
        phi = (phi + self.delta_phi * share).clamp(EPS, PI - EPS);
        radius = (radius * self.scale).clamp(self.options.min_distance, self.options.max_distance);
        self.target += self.pan_offset * share;

        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        let new_position = self.target + new_offset;
        let moved = (new_position - camera.position).length_squared() > EPS
            || (self.target - camera.target).length_squared() > EPS;

        camera.position = new_position;
        camera.target = self.target;

        if damping > 0.0 {
            self.delta_theta *= 1.0 - damping;
            self.delta_phi *= 1.0 - damping;
            self.pan_offset *= 1.0 - damping;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        moved
    }

    /// Stops reacting to input. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.pan_offset = Vec3::ZERO;
        self.scale = 1.0;
        debug!("orbit controls disposed");
    }
}
