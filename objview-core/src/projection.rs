/// Perspective projection and screen mapping
use nalgebra::{Matrix4, Point3};

/// Caller-owned projection parameters. The field of view comes from the
/// camera each frame; the aspect ratio follows the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, near: f32, far: f32) -> Self {
        Self {
            aspect: aspect_ratio(width as f32, height as f32),
            near,
            far,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn matrix(&self, fov_degrees: f32) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, fov_degrees.to_radians(), self.near, self.far)
    }
}

fn aspect_ratio(width: f32, height: f32) -> f32 {
    if width > 0.0 && height > 0.0 {
        width / height
    } else {
        1.0
    }
}

/// A projected point: screen coordinates plus NDC depth in `[-1, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
}

/// Project a model-space point through `mvp` to screen space. Returns `None`
/// for points behind the camera or outside the view volume.
pub fn project_to_screen(
    mvp: &Matrix4<f32>,
    point: &Point3<f32>,
    width: u32,
    height: u32,
) -> Option<ScreenPoint> {
    let clip = mvp * point.to_homogeneous();

    // Prevent division by near-zero or negative w
    if clip.w < 1e-6 {
        return None;
    }

    let ndc = clip.xyz() / clip.w;

    // Clip test
    if ndc.iter().any(|c| !(-1.0..=1.0).contains(c)) {
        return None;
    }

    Some(ScreenPoint {
        x: (ndc.x + 1.0) * 0.5 * width as f32,
        y: (1.0 - ndc.y) * 0.5 * height as f32,
        depth: ndc.z,
    })
}
