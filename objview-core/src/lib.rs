//! objview core library - geometry ingestion and camera logic
//!
//! This library holds everything the viewer does that is independent of the
//! output device: Wavefront-style parsing, geometry building, the
//! first-person camera, projection helpers and configuration.

pub mod camera;
pub mod config;
pub mod device;
pub mod error;
pub mod geometry;
pub mod projection;
pub mod transform;
pub mod wavefront;

// Re-export commonly used types
pub use camera::{Camera, CameraLimits, CameraMovement};
pub use config::{CameraOptions, LoadOptions, RenderOptions, ViewerConfig};
pub use device::{FrameUniforms, ModelSlot, RenderDevice};
pub use error::{ConfigError, GeometryError, LineError, ObjError, ObjResult};
pub use geometry::{load_geometry, Bounds, FacePolicy, GeometryBuffer, GeometryBuilder, GeometrySummary};
pub use projection::{project_to_screen, Projection, ScreenPoint};
pub use transform::Transform;
