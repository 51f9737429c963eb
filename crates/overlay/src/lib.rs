//! Signature overlay model and gestures
//!
//! Overlays live in a shared, ordered [`OverlayList`]; their durable
//! coordinates are normalized native-space values, with display pixels
//! re-derived after every render. Drag and resize run through an
//! [`OverlayController`] that commits on release with a trailing
//! debounce.

pub mod controller;
pub mod model;

pub use controller::{
    GestureState, OverlayController, WorkingBox, MIN_OVERLAY_HEIGHT, MIN_OVERLAY_WIDTH,
};
pub use model::{
    place_overlay, resync_page_from_store, ImageRef, Overlay, OverlayId, OverlayList,
    OverlayPatch, Point,
};
