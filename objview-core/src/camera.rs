/// Free-flying first-person camera
use nalgebra::{Matrix4, Point3, Vector3};

use crate::config::CameraOptions;

/// Direction for keyboard movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Clamp limits for orientation and field of view, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraLimits {
    pub pitch: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self {
            pitch: 89.0,
            zoom_min: 1.0,
            zoom_max: 45.0,
        }
    }
}

impl CameraLimits {
    /// Replace unusable limits with the defaults. Pitch must lie in (0, 90)
    /// and the zoom range must be finite, positive and ordered.
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        let pitch_ok = self.pitch > 0.0 && self.pitch < 90.0;
        let zoom_ok = self.zoom_min > 0.0 && self.zoom_min <= self.zoom_max && self.zoom_max < 180.0;
        Self {
            pitch: if pitch_ok { self.pitch } else { defaults.pitch },
            zoom_min: if zoom_ok { self.zoom_min } else { defaults.zoom_min },
            zoom_max: if zoom_ok { self.zoom_max } else { defaults.zoom_max },
        }
    }

    /// Largest pitch the camera may hold: the float just below the limit,
    /// so the interval stays open
    pub fn max_pitch(&self) -> f32 {
        f32::from_bits(self.pitch.to_bits() - 1)
    }

    fn clamp_pitch(&self, pitch: f32) -> f32 {
        let max = self.max_pitch();
        pitch.clamp(-max, max)
    }
}

/// Camera position and orientation. The basis vectors and view matrix are
/// derived from yaw/pitch on every query.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    yaw: f32,
    pitch: f32,
    zoom: f32,
    /// Units per second
    pub speed: f32,
    limits: CameraLimits,
    world_up: Vector3<f32>,
}

impl Camera {
    pub fn new(position: Point3<f32>, yaw: f32, pitch: f32) -> Self {
        let limits = CameraLimits::default();
        Self {
            position,
            yaw,
            pitch: if pitch.is_finite() { limits.clamp_pitch(pitch) } else { 0.0 },
            zoom: limits.zoom_max,
            speed: 2.5,
            limits,
            world_up: Vector3::y(),
        }
    }

    /// Build a camera from options. Non-finite or out-of-range values fall
    /// back to the defaults so the clamp invariants hold from the start.
    pub fn from_options(options: &CameraOptions) -> Self {
        let defaults = CameraOptions::default();
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };

        let position = if options.position.iter().all(|c| c.is_finite()) {
            options.position
        } else {
            defaults.position
        };
        let [x, y, z] = position;
        let limits = CameraLimits {
            pitch: options.pitch_limit,
            zoom_min: options.zoom_min,
            zoom_max: options.zoom_max,
        }
        .validated();
        let speed = if options.speed.is_finite() && options.speed >= 0.0 {
            options.speed
        } else {
            defaults.speed
        };

        Self {
            position: Point3::new(x, y, z),
            yaw: finite_or(options.yaw, defaults.yaw),
            pitch: limits.clamp_pitch(finite_or(options.pitch, defaults.pitch)),
            zoom: finite_or(options.zoom, limits.zoom_max).clamp(limits.zoom_min, limits.zoom_max),
            speed,
            limits,
            world_up: Vector3::y(),
        }
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Current field of view in degrees
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn limits(&self) -> CameraLimits {
        self.limits
    }

    /// Move `speed * delta_time` along the forward or right vector
    pub fn translate(&mut self, direction: CameraMovement, delta_time: f32) {
        let distance = self.speed * delta_time;
        if !distance.is_finite() {
            return;
        }
        let offset = match direction {
            CameraMovement::Forward => self.forward() * distance,
            CameraMovement::Backward => -self.forward() * distance,
            CameraMovement::Left => -self.right() * distance,
            CameraMovement::Right => self.right() * distance,
        };
        self.position += offset;
    }

    /// Accumulate look offsets in degrees. Pitch is clamped after adding.
    pub fn set_euler_angles(&mut self, x_offset: f32, y_offset: f32) {
        if !(x_offset.is_finite() && y_offset.is_finite()) {
            return;
        }
        self.yaw += x_offset;
        self.pitch = self.limits.clamp_pitch(self.pitch + y_offset);
    }

    /// Narrow (positive delta) or widen the field of view, saturating at the limits
    pub fn set_zoom(&mut self, scroll_delta: f32) {
        if !scroll_delta.is_finite() {
            return;
        }
        self.zoom = (self.zoom - scroll_delta).clamp(self.limits.zoom_min, self.limits.zoom_max);
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(&self.world_up).normalize()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.right().cross(&self.forward()).normalize()
    }

    /// Look-at matrix from the current position and orientation
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let target = self.position + self.forward();
        Matrix4::look_at_rh(&self.position, &target, &self.up())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 0.0, 3.0), -90.0, 0.0)
    }
}
