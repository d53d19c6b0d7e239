/// Render-ready geometry built from parsed records
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, ObjError, ObjResult};
use crate::wavefront::{self, Face, ParsedObj};

/// What to do with a face that references a position that does not exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacePolicy {
    /// Abort the build on the first bad face
    #[default]
    Reject,
    /// Drop the bad face and keep building
    Skip,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds {
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

/// Counts reported after a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometrySummary {
    pub vertex_count: usize,
    pub normal_count: usize,
    pub tex_coord_count: usize,
    pub index_count: usize,
    pub skipped_faces: usize,
}

/// Finalized position and index buffers, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryBuffer {
    positions: Vec<Point3<f32>>,
    normals: Vec<Vector3<f32>>,
    tex_coords: Vec<Vector2<f32>>,
    indices: Vec<u32>,
    skipped_faces: usize,
}

impl GeometryBuffer {
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vector3<f32>] {
        &self.normals
    }

    pub fn tex_coords(&self) -> &[Vector2<f32>] {
        &self.tex_coords
    }

    /// 0-based indices into [`positions`](Self::positions), three per triangle
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Positions flattened to `[x, y, z, x, y, z, ...]` for upload
    pub fn packed_positions(&self) -> Vec<f32> {
        self.positions
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect()
    }

    /// Corner positions of every triangle, in index order
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.positions[tri[0] as usize],
                self.positions[tri[1] as usize],
                self.positions[tri[2] as usize],
            ]
        })
    }

    /// Bounds of all declared positions, `None` when there are none
    pub fn bounds(&self) -> Option<Bounds> {
        let first = *self.positions.first()?;
        let bounds = self.positions.iter().fold(
            Bounds {
                min: first,
                max: first,
            },
            |b, p| Bounds {
                min: b.min.inf(p),
                max: b.max.sup(p),
            },
        );
        Some(bounds)
    }

    pub fn summary(&self) -> GeometrySummary {
        GeometrySummary {
            vertex_count: self.positions.len(),
            normal_count: self.normals.len(),
            tex_coord_count: self.tex_coords.len(),
            index_count: self.indices.len(),
            skipped_faces: self.skipped_faces,
        }
    }
}

/// Converts parsed sequences into a [`GeometryBuffer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryBuilder {
    policy: FacePolicy,
}

impl GeometryBuilder {
    pub fn new(policy: FacePolicy) -> Self {
        Self { policy }
    }

    pub fn build(&self, parsed: &ParsedObj) -> Result<GeometryBuffer, GeometryError> {
        let mut indices = Vec::with_capacity(parsed.faces.len() * 3);
        let mut skipped_faces = 0;

        for face in &parsed.faces {
            match face_indices(face) {
                Ok(triple) => indices.extend_from_slice(&triple),
                Err(err) => match self.policy {
                    FacePolicy::Reject => return Err(err),
                    FacePolicy::Skip => {
                        log::warn!("{} (face skipped)", err);
                        skipped_faces += 1;
                    }
                },
            }
        }

        let geometry = GeometryBuffer {
            positions: parsed.positions.clone(),
            normals: parsed.normals.clone(),
            tex_coords: parsed.tex_coords.clone(),
            indices,
            skipped_faces,
        };

        let summary = geometry.summary();
        log::info!(
            "geometry built: {} vertices, {} normals, {} tex coords, {} indices",
            summary.vertex_count,
            summary.normal_count,
            summary.tex_coord_count,
            summary.index_count
        );
        if summary.skipped_faces > 0 {
            log::warn!("{} faces skipped", summary.skipped_faces);
        }

        Ok(geometry)
    }
}

/// Translate one face to 0-based indices, checking each against the
/// positions declared before it.
fn face_indices(face: &Face) -> Result<[u32; 3], GeometryError> {
    let mut out = [0; 3];
    for (slot, vertex) in out.iter_mut().zip(&face.vertices) {
        let index = vertex.position;
        if index == 0 || index as usize > face.declared_positions {
            return Err(GeometryError::IndexOutOfRange {
                line: face.line,
                index,
                available: face.declared_positions,
            });
        }
        *slot = index - 1;
    }
    Ok(out)
}

/// Open, parse and build a geometry file
pub fn load_geometry(path: &Path, policy: FacePolicy) -> ObjResult<GeometryBuffer> {
    let file = File::open(path).map_err(|source| ObjError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("loading geometry from {}", path.display());

    let parsed = wavefront::parse_reader(BufReader::new(file))?;
    if !parsed.diagnostics.is_empty() {
        log::warn!("{} lines skipped while parsing", parsed.diagnostics.len());
    }
    Ok(GeometryBuilder::new(policy).build(&parsed)?)
}

/// Unit normal of a triangle, `None` for degenerate triangles
pub fn face_normal(a: &Point3<f32>, b: &Point3<f32>, c: &Point3<f32>) -> Option<Vector3<f32>> {
    let edge1 = b - a;
    let edge2 = c - a;
    edge1.cross(&edge2).try_normalize(1e-12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wavefront::parse_str;

    fn build(text: &str) -> Result<GeometryBuffer, GeometryError> {
        GeometryBuilder::default().build(&parse_str(text))
    }

    #[test]
    fn test_single_triangle() {
        let geometry = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(
            geometry.positions(),
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0)
            ]
        );
        assert_eq!(geometry.indices(), &[0, 1, 2]);
        assert_eq!(geometry.triangle_count(), 1);
    }

    #[test]
    fn test_index_past_declared_positions() {
        let err = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 5\n").unwrap_err();
        assert_eq!(
            err,
            GeometryError::IndexOutOfRange {
                line: 4,
                index: 5,
                available: 3
            }
        );
    }

    #[test]
    fn test_zero_index_is_out_of_range() {
        let err = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n").unwrap_err();
        assert!(matches!(err, GeometryError::IndexOutOfRange { index: 0, .. }));
    }

    #[test]
    fn test_forward_reference_is_out_of_range() {
        // position 3 exists in the file, but only after the face
        let err = build("v 0 0 0\nv 1 0 0\nf 1 2 3\nv 0 1 0\n").unwrap_err();
        assert!(matches!(
            err,
            GeometryError::IndexOutOfRange {
                index: 3,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_skip_policy_drops_bad_faces() {
        let parsed = parse_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 9 3\nf 2 4 3\n");
        let geometry = GeometryBuilder::new(FacePolicy::Skip).build(&parsed).unwrap();
        assert_eq!(geometry.indices(), &[0, 1, 2, 1, 3, 2]);
        let summary = geometry.summary();
        assert_eq!(summary.skipped_faces, 1);
        assert_eq!(summary.index_count, 3 * 2);
    }

    #[test]
    fn test_indices_follow_declaration_order() {
        let geometry = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 4 2 1\nf 3/1/1 1//2 2/4\n").unwrap();
        assert_eq!(geometry.indices(), &[3, 1, 0, 2, 0, 1]);
        assert_eq!(geometry.index_count(), 3 * 2);
    }

    #[test]
    fn test_summary_counts() {
        let geometry = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvt 0 0\nvt 1 0\nf 1 2 3\n").unwrap();
        let summary = geometry.summary();
        assert_eq!(summary.vertex_count, 3);
        assert_eq!(summary.normal_count, 1);
        assert_eq!(summary.tex_coord_count, 2);
        assert_eq!(summary.index_count, 3);
        assert_eq!(summary.skipped_faces, 0);
    }

    #[test]
    fn test_packed_positions_and_bounds() {
        let geometry = build("v -1 0 2\nv 3 -4 0\n").unwrap();
        assert_eq!(geometry.packed_positions(), vec![-1.0, 0.0, 2.0, 3.0, -4.0, 0.0]);
        let bounds = geometry.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(-1.0, -4.0, 0.0));
        assert_eq!(bounds.max, Point3::new(3.0, 0.0, 2.0));
        assert_eq!(bounds.center(), Point3::new(1.0, -2.0, 1.0));
        assert!(build("").unwrap().bounds().is_none());
    }

    #[test]
    fn test_face_normal() {
        let n = face_normal(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert!((n - Vector3::z()).norm() < 1e-6);

        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(face_normal(&p, &p, &p).is_none());
    }

    #[test]
    fn test_load_geometry_missing_file() {
        let err = load_geometry(Path::new("/nonexistent/model.obj"), FacePolicy::Reject).unwrap_err();
        assert!(matches!(err, ObjError::Open { .. }));
    }

    #[test]
    fn test_load_geometry_from_file() {
        let path = std::env::temp_dir().join(format!("objview-load-{}.obj", std::process::id()));
        std::fs::write(&path, "# tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let geometry = load_geometry(&path, FacePolicy::Reject).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(geometry.index_count(), 3);
    }
}
