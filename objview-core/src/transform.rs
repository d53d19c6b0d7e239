/// Model matrix helpers
use nalgebra::{Matrix4, Vector3};

use crate::geometry::Bounds;

/// Transform builder for model placement
pub struct Transform;

impl Transform {
    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a scale matrix
    pub fn scale_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Centre `bounds` on the origin and scale its largest side to 2 units
    pub fn fit_to_unit_cube(bounds: &Bounds) -> Matrix4<f32> {
        let center = bounds.center();
        let largest = bounds.extent().max();
        let scale = if largest > f32::EPSILON { 2.0 / largest } else { 1.0 };

        Self::scale_matrix(scale, scale, scale) * Self::translation_matrix(-center.x, -center.y, -center.z)
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}
