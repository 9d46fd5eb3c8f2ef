//! Render orchestration: acceleration structures over the instanced meshes,
//! the camera, direct lighting with optional shadow rays, depth-bounded
//! secondary rays for shaders, and parallel pixel dispatch.
//!
//! # Invariants
//! - The scene is borrowed immutably for the whole render.
//! - Workers only write their own band of output rows.
//! - A failed render commits nothing; a completed one commits a frame sized
//!   exactly to the renderer resolution.

pub mod accel;
pub mod camera;
pub mod error;
pub mod geometry;
pub mod job;
pub mod sampling;
pub mod tracer;

pub use error::RenderError;
pub use geometry::SceneGeometry;
pub use job::{
    MAX_FRAME_SAMPLES, RenderJob, RenderOptions, RenderOutput, RenderReport, RenderState, render,
};
pub use tracer::{DEFAULT_APPEARANCE, RenderScene, RenderSettings};
