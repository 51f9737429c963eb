//! Viewer session facade
//!
//! Ties the render pipeline, viewport tracking, overlays and thumbnail
//! prefetching into one [`ViewerSession`] per open document, and
//! exports overlay placements for the signing step.

pub mod export;
pub mod session;

pub use export::{placements, PlacementRecord, Position, Size};
pub use session::{
    SessionError, ViewerSession, DEFAULT_OVERLAY_HEIGHT, DEFAULT_OVERLAY_WIDTH, DEFAULT_SCALE,
    MAX_SCALE, MIN_SCALE, ZOOM_STEP,
};
