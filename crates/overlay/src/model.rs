//! Overlay data model and shared list
//!
//! An overlay is a signature image placed on a page. Its position and
//! size exist in two coordinate spaces at once: display pixels for hit
//! testing and drawing at the current zoom, and normalized native units
//! that are the durable source of truth. Display values are re-derived
//! from normalized values on every re-render; normalized values change
//! only when a gesture commits.

use sign_viewer_geometry::{DimensionStore, PageDimensions};
use std::sync::{Arc, Mutex};

/// Unique identifier for an overlay
///
/// Generated with UUID v4 at placement time, stable for the overlay's
/// lifetime.
pub type OverlayId = uuid::Uuid;

/// Opaque reference to the signature image an overlay displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef(pub String);

/// Display-space point (pixels at the current zoom)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A signature overlay placed on a page
///
/// The `normalized_*` fields are in native document units and survive
/// zoom and container resizes unchanged. The plain fields are display
/// pixels, valid only for the dimension record they were last synced
/// against.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub id: OverlayId,
    pub page_number: u32,

    /// Display-space position of the top-left corner
    pub x: f64,
    pub y: f64,

    /// Display-space size
    pub width: f64,
    pub height: f64,

    /// Native-space position and size (source of truth)
    pub normalized_x: f64,
    pub normalized_y: f64,
    pub normalized_width: f64,
    pub normalized_height: f64,

    pub image_ref: ImageRef,
}

impl Overlay {
    /// Re-derive display fields from the normalized fields
    ///
    /// Called after every re-render of the overlay's page so the box
    /// lands on the same spot of the page content at the new zoom.
    pub fn sync_display(&mut self, dims: &PageDimensions) {
        self.x = dims.to_display_x(self.normalized_x);
        self.y = dims.to_display_y(self.normalized_y);
        self.width = dims.to_display_x(self.normalized_width);
        self.height = dims.to_display_y(self.normalized_height);
    }

    /// Re-derive normalized fields from the display fields
    ///
    /// The one place display values flow back into native space: the
    /// commit at the end of a drag or resize gesture.
    pub fn capture_normalized(&mut self, dims: &PageDimensions) {
        self.normalized_x = dims.to_native_x(self.x);
        self.normalized_y = dims.to_native_y(self.y);
        self.normalized_width = dims.to_native_x(self.width);
        self.normalized_height = dims.to_native_y(self.height);
    }
}

/// Display-space geometry update for one overlay
///
/// Produced by a gesture controller and applied through
/// [`OverlayList::patch`]. Later patches win over earlier ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPatch {
    pub id: OverlayId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub normalized_x: f64,
    pub normalized_y: f64,
    pub normalized_width: f64,
    pub normalized_height: f64,
}

struct ListState {
    overlays: Vec<Overlay>,
    active: Option<OverlayId>,
}

/// Shared, ordered collection of overlays across all pages
///
/// Cloning shares the underlying list. Order is placement order and is
/// preserved by patches and removals; the export walks it in this
/// order.
#[derive(Clone)]
pub struct OverlayList {
    inner: Arc<Mutex<ListState>>,
}

impl OverlayList {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListState {
                overlays: Vec::new(),
                active: None,
            })),
        }
    }

    /// Add a new overlay and make it the active one
    pub fn place(&self, overlay: Overlay) -> OverlayId {
        let id = overlay.id;
        let mut state = self.inner.lock().unwrap();
        state.overlays.push(overlay);
        state.active = Some(id);
        id
    }

    /// Snapshot of one overlay
    pub fn get(&self, id: OverlayId) -> Option<Overlay> {
        let state = self.inner.lock().unwrap();
        state.overlays.iter().find(|o| o.id == id).cloned()
    }

    /// Apply a geometry patch; a patch for a removed overlay is a no-op
    pub fn patch(&self, patch: OverlayPatch) {
        let mut state = self.inner.lock().unwrap();
        if let Some(overlay) = state.overlays.iter_mut().find(|o| o.id == patch.id) {
            overlay.x = patch.x;
            overlay.y = patch.y;
            overlay.width = patch.width;
            overlay.height = patch.height;
            overlay.normalized_x = patch.normalized_x;
            overlay.normalized_y = patch.normalized_y;
            overlay.normalized_width = patch.normalized_width;
            overlay.normalized_height = patch.normalized_height;
        }
    }

    /// Remove exactly the overlay with this id, preserving the order of
    /// the rest
    ///
    /// Returns the removed overlay, or `None` if the id is unknown.
    pub fn remove(&self, id: OverlayId) -> Option<Overlay> {
        let mut state = self.inner.lock().unwrap();
        let index = state.overlays.iter().position(|o| o.id == id)?;
        if state.active == Some(id) {
            state.active = None;
        }
        Some(state.overlays.remove(index))
    }

    /// Mark one overlay active, deactivating any other
    pub fn set_active(&self, id: OverlayId) {
        let mut state = self.inner.lock().unwrap();
        if state.overlays.iter().any(|o| o.id == id) {
            state.active = Some(id);
        }
    }

    /// The currently active overlay id, if any
    pub fn active(&self) -> Option<OverlayId> {
        let state = self.inner.lock().unwrap();
        state.active
    }

    pub fn clear_active(&self) {
        let mut state = self.inner.lock().unwrap();
        state.active = None;
    }

    /// Snapshots of all overlays on one page, in placement order
    pub fn for_page(&self, page_number: u32) -> Vec<Overlay> {
        let state = self.inner.lock().unwrap();
        state
            .overlays
            .iter()
            .filter(|o| o.page_number == page_number)
            .cloned()
            .collect()
    }

    /// Re-derive display fields for every overlay on a page
    ///
    /// Called after the page re-renders with fresh dimensions.
    pub fn resync_page(&self, page_number: u32, dims: &PageDimensions) {
        let mut state = self.inner.lock().unwrap();
        for overlay in state
            .overlays
            .iter_mut()
            .filter(|o| o.page_number == page_number)
        {
            overlay.sync_display(dims);
        }
    }

    /// Snapshots of all overlays, in placement order
    pub fn snapshot(&self) -> Vec<Overlay> {
        let state = self.inner.lock().unwrap();
        state.overlays.clone()
    }

    pub fn len(&self) -> usize {
        let state = self.inner.lock().unwrap();
        state.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        let state = self.inner.lock().unwrap();
        state.overlays.is_empty()
    }
}

impl Default for OverlayList {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an overlay at a display-space position, capturing normalized
/// coordinates from the page's current dimensions
pub fn place_overlay(
    page_number: u32,
    position: Point,
    width: f64,
    height: f64,
    image_ref: ImageRef,
    dims: &PageDimensions,
) -> Overlay {
    let mut overlay = Overlay {
        id: uuid::Uuid::new_v4(),
        page_number,
        x: position.x,
        y: position.y,
        width,
        height,
        normalized_x: 0.0,
        normalized_y: 0.0,
        normalized_width: 0.0,
        normalized_height: 0.0,
        image_ref,
    };
    overlay.capture_normalized(dims);
    overlay
}

/// Convenience used by sessions and the controller: look up the page's
/// dimensions and resync in one step
pub fn resync_page_from_store(list: &OverlayList, page_number: u32, store: &DimensionStore) {
    if let Some(dims) = store.get(page_number) {
        list.resync_page(page_number, &dims);
    }
}
