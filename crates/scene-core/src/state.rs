//! Camera state shared by the session and the frontends.
//!
//! These types avoid platform-specific APIs. The session reads the camera's
//! world matrix for the audio listener pose and its position for bubble
//! billboarding; frontends build view/projection matrices from it.

use glam::{Mat4, Vec3};
use std::f32::consts::{PI, TAU};

/// Simple right-handed camera description with perspective projection.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 2.0, 335.0),
            target: Vec3::new(0.0, 135.0, 0.0),
            up: Vec3::Y,
            aspect: 16.0 / 9.0,
            fovy_radians: std::f32::consts::FRAC_PI_4,
            znear: 0.1,
            zfar: 5000.0,
        }
    }
}

impl Camera {
    pub fn position(&self) -> Vec3 {
        self.eye
    }
    /// Compute the clip-space projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }
    /// Compute the view matrix that transforms world to view space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }
    /// Camera-to-world transform; this is the pose sent to the audio listener.
    pub fn world_matrix(&self) -> Mat4 {
        self.view_matrix().inverse()
    }
    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Slow automatic orbit around the scene, released by user input.
///
/// The radius drifts inwards and bounces off `radius_max`; once it has come
/// inside `radius_min` the orbit keeps accelerating until it hands control
/// back to the user.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pub enabled: bool,
    pub target: Vec3,
    pub eye_height: f32,
    pub radius: f32,
    pub radius_min: f32,
    pub radius_max: f32,
    pub angle: f32,
    speed: f32,
    radius_direction: f32,
}

const ORBIT_SPEED: f32 = 4000.0;
const ORBIT_SPEED_RELEASE: f32 = 50000.0;
const ORBIT_ACCELERATION: f32 = 1.0025;

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            enabled: true,
            target: Vec3::new(0.0, 100.0, -50.0),
            eye_height: 2.0,
            radius: 65.0,
            radius_min: 50.0,
            radius_max: 400.0,
            angle: PI,
            speed: ORBIT_SPEED,
            radius_direction: -1.0,
        }
    }
}

impl OrbitCamera {
    /// Move `camera` along the orbit for session time `time`.
    pub fn update(&mut self, camera: &mut Camera, time: f32) {
        if !self.enabled {
            return;
        }
        if self.radius < self.radius_min {
            self.speed *= ORBIT_ACCELERATION;
            if self.speed > ORBIT_SPEED_RELEASE {
                self.release("orbit finished");
            }
        } else if self.radius > self.radius_max {
            self.radius_direction = -self.radius_direction;
        }
        self.radius -= time / (self.speed / 2.0) * self.radius_direction;
        self.angle = (self.angle + PI * time / (360.0 * self.speed)) % TAU;

        camera.eye = Vec3::new(
            self.radius * self.angle.sin(),
            self.eye_height,
            self.radius * self.angle.cos(),
        );
        camera.target = self.target;
    }

    /// Stop animating; the user has taken over the camera.
    pub fn release(&mut self, reason: &str) {
        if self.enabled {
            self.enabled = false;
            log::info!("[camera] animation lock released: {reason}");
        }
    }
}
