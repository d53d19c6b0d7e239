//! Viewer settings with TOML file support.
//!
//! Every section uses `#[serde(default)]` so a file that only overrides
//! `[camera]` (or a single field of it) still loads.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::FacePolicy;

/// Smallest allowed `far / near - 1`
const MIN_CLIP_GAP: f32 = 1e-3;

/// Top-level configuration container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraOptions,
    pub render: RenderOptions,
    pub load: LoadOptions,
}

/// Camera start pose, control rates and clamp limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    pub position: [f32; 3],
    /// Degrees; -90 looks down -Z
    pub yaw: f32,
    /// Degrees
    pub pitch: f32,
    /// Units per second
    pub speed: f32,
    /// Degrees per mouse cell
    pub sensitivity: f32,
    /// Degrees per second for keyboard look
    pub look_rate: f32,
    /// Pitch stays strictly inside `(-pitch_limit, pitch_limit)`
    pub pitch_limit: f32,
    /// Field of view bounds and start value, in degrees
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom: f32,
    /// Degrees per scroll notch
    pub zoom_step: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            yaw: -90.0,
            pitch: 0.0,
            speed: 2.5,
            sensitivity: 1.5,
            look_rate: 90.0,
            pitch_limit: 89.0,
            zoom_min: 1.0,
            zoom_max: 45.0,
            zoom: 45.0,
            zoom_step: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Frame output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Uniform model colour, RGB
    pub color: [u8; 3],
    pub target_fps: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: [0, 220, 30],
            target_fps: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub face_policy: FacePolicy,
}

impl ViewerConfig {
    /// Load a config file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config.sanitized())
    }

    /// Pull out-of-range values back into a usable range, warning on each fix
    pub fn sanitized(mut self) -> Self {
        let defaults = CameraOptions::default();
        let camera = &mut self.camera;

        if !(camera.pitch_limit > 0.0 && camera.pitch_limit < 90.0) {
            log::warn!(
                "camera.pitch_limit {} must be inside (0, 90), using {}",
                camera.pitch_limit,
                defaults.pitch_limit
            );
            camera.pitch_limit = defaults.pitch_limit;
        }
        if !(camera.zoom_min > 0.0 && camera.zoom_min <= camera.zoom_max && camera.zoom_max < 180.0) {
            log::warn!(
                "camera zoom range [{}, {}] is invalid, using [{}, {}]",
                camera.zoom_min,
                camera.zoom_max,
                defaults.zoom_min,
                defaults.zoom_max
            );
            camera.zoom_min = defaults.zoom_min;
            camera.zoom_max = defaults.zoom_max;
        }
        if !camera.position.iter().all(|c| c.is_finite()) {
            log::warn!("camera.position {:?} is not finite, using {:?}", camera.position, defaults.position);
            camera.position = defaults.position;
        }
        for (name, value, fallback) in [
            ("yaw", &mut camera.yaw, defaults.yaw),
            ("pitch", &mut camera.pitch, defaults.pitch),
            ("zoom", &mut camera.zoom, camera.zoom_max),
            ("sensitivity", &mut camera.sensitivity, defaults.sensitivity),
            ("look_rate", &mut camera.look_rate, defaults.look_rate),
        ] {
            if !value.is_finite() {
                log::warn!("camera.{} {} is not finite, using {}", name, value, fallback);
                *value = fallback;
            }
        }
        for (name, value, fallback) in [
            ("speed", &mut camera.speed, defaults.speed),
            ("zoom_step", &mut camera.zoom_step, defaults.zoom_step),
        ] {
            if !(value.is_finite() && *value > 0.0) {
                log::warn!("camera.{} {} must be positive, using {}", name, value, fallback);
                *value = fallback;
            }
        }
        // The perspective matrix needs a clear gap between the planes
        if !(camera.near > 0.0 && camera.far.is_finite() && camera.far > camera.near * (1.0 + MIN_CLIP_GAP)) {
            log::warn!(
                "camera clip planes near={} far={} are invalid, using near={} far={}",
                camera.near,
                camera.far,
                defaults.near,
                defaults.far
            );
            camera.near = defaults.near;
            camera.far = defaults.far;
        }
        if self.render.target_fps == 0 {
            log::warn!("render.target_fps must be at least 1, using 1");
            self.render.target_fps = 1;
        }

        self
    }
}
