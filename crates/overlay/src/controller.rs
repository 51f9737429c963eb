//! Drag and resize gestures for a single overlay
//!
//! A controller owns a working copy of one overlay's display box and a
//! gesture state machine. Pointer moves mutate only the working box;
//! nothing reaches the shared list until the gesture ends, and even
//! then the commit goes through a trailing debouncer so a burst of
//! quick adjustments lands as one update. Detaching discards any
//! pending commit.

use crate::model::{OverlayId, OverlayList, OverlayPatch, Point};
use sign_viewer_geometry::{Debouncer, DimensionStore};
use std::time::Instant;

/// Smallest size a resize can reach, display pixels
pub const MIN_OVERLAY_WIDTH: f64 = 50.0;
pub const MIN_OVERLAY_HEIGHT: f64 = 30.0;

/// What the pointer is currently doing to the overlay
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    /// Pointer is down inside the box; the offset from the box origin
    /// to the grab point stays fixed for the whole drag.
    Dragging { grab_offset: Point },
    /// Pointer is down on the resize handle; each move applies the
    /// delta from the previous pointer position and re-anchors.
    Resizing { last_pointer: Point },
}

/// Display-space working box, detached from the shared list during a
/// gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WorkingBox {
    fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

/// Gesture controller for one overlay
pub struct OverlayController {
    id: OverlayId,
    page_number: u32,
    overlays: OverlayList,
    dimensions: DimensionStore,
    working: WorkingBox,
    gesture: GestureState,
    commit: Debouncer<OverlayPatch>,
    detached: bool,
}

impl OverlayController {
    /// Attach to an overlay in the list
    ///
    /// Returns `None` if the id is not (or no longer) in the list.
    pub fn attach(id: OverlayId, overlays: OverlayList, dimensions: DimensionStore) -> Option<Self> {
        let overlay = overlays.get(id)?;
        Some(Self {
            id,
            page_number: overlay.page_number,
            overlays,
            dimensions,
            working: WorkingBox {
                x: overlay.x,
                y: overlay.y,
                width: overlay.width,
                height: overlay.height,
            },
            gesture: GestureState::Idle,
            commit: Debouncer::default(),
            detached: false,
        })
    }

    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// The live box as the gesture sees it, for drawing
    pub fn working(&self) -> WorkingBox {
        self.working
    }

    pub fn gesture(&self) -> GestureState {
        self.gesture
    }

    /// Begin a drag if the pointer is inside the box
    ///
    /// Returns whether the event was consumed. A hit also activates the
    /// overlay.
    pub fn pointer_down(&mut self, pointer: Point) -> bool {
        if self.detached || !self.refresh_working() || !self.working.contains(pointer) {
            return false;
        }
        self.overlays.set_active(self.id);
        self.gesture = GestureState::Dragging {
            grab_offset: Point::new(pointer.x - self.working.x, pointer.y - self.working.y),
        };
        true
    }

    /// Begin a resize from the corner handle
    pub fn resize_start(&mut self, pointer: Point) {
        if self.detached || !self.refresh_working() {
            return;
        }
        self.overlays.set_active(self.id);
        self.gesture = GestureState::Resizing {
            last_pointer: pointer,
        };
    }

    /// Re-read the overlay's committed box from the shared list
    ///
    /// The list is authoritative between gestures; a zoom may have
    /// resynced display fields since this controller last looked.
    /// Returns `false` if the overlay has been removed.
    fn refresh_working(&mut self) -> bool {
        let Some(overlay) = self.overlays.get(self.id) else {
            return false;
        };
        self.working = WorkingBox {
            x: overlay.x,
            y: overlay.y,
            width: overlay.width,
            height: overlay.height,
        };
        true
    }

    /// Apply a pointer move to the active gesture
    pub fn pointer_move(&mut self, pointer: Point) {
        match self.gesture {
            GestureState::Idle => {}
            GestureState::Dragging { grab_offset } => {
                self.working.x = pointer.x - grab_offset.x;
                self.working.y = pointer.y - grab_offset.y;
                self.clamp_position();
            }
            GestureState::Resizing { last_pointer } => {
                self.working.width += pointer.x - last_pointer.x;
                self.working.height += pointer.y - last_pointer.y;
                self.clamp_size();
                self.gesture = GestureState::Resizing {
                    last_pointer: pointer,
                };
            }
        }
    }

    /// End the gesture and queue the commit
    ///
    /// If the page has no published dimensions yet the commit is
    /// skipped; normalized coordinates cannot be captured without them.
    pub fn pointer_up(&mut self, now: Instant) {
        if self.gesture == GestureState::Idle {
            return;
        }
        self.gesture = GestureState::Idle;

        let Some(dims) = self.dimensions.get(self.page_number) else {
            log::debug!(
                "overlay {} on page {} released before dimensions published, skipping commit",
                self.id,
                self.page_number
            );
            return;
        };

        self.commit.submit(
            OverlayPatch {
                id: self.id,
                x: self.working.x,
                y: self.working.y,
                width: self.working.width,
                height: self.working.height,
                normalized_x: dims.to_native_x(self.working.x),
                normalized_y: dims.to_native_y(self.working.y),
                normalized_width: dims.to_native_x(self.working.width),
                normalized_height: dims.to_native_y(self.working.height),
            },
            now,
        );
    }

    /// Apply the queued commit if its quiet window has elapsed
    pub fn poll(&mut self, now: Instant) {
        if let Some(patch) = self.commit.poll(now) {
            self.apply(patch);
        }
    }

    /// Apply the queued commit immediately
    ///
    /// Called on teardown so the trailing edit is never lost.
    pub fn flush(&mut self) {
        if let Some(patch) = self.commit.flush() {
            self.apply(patch);
        }
    }

    /// Stop controlling the overlay and discard anything pending
    pub fn detach(&mut self) {
        self.detached = true;
        self.gesture = GestureState::Idle;
        self.commit.flush();
    }

    /// Remove the overlay from the list and detach
    pub fn delete(&mut self) {
        self.overlays.remove(self.id);
        self.detach();
    }

    fn apply(&self, patch: OverlayPatch) {
        if !self.detached {
            self.overlays.patch(patch);
        }
    }

    fn clamp_position(&mut self) {
        if let Some(dims) = self.dimensions.get(self.page_number) {
            let max_x = (dims.display_width - self.working.width).max(0.0);
            let max_y = (dims.display_height - self.working.height).max(0.0);
            self.working.x = self.working.x.clamp(0.0, max_x);
            self.working.y = self.working.y.clamp(0.0, max_y);
        } else {
            self.working.x = self.working.x.max(0.0);
            self.working.y = self.working.y.max(0.0);
        }
    }

    fn clamp_size(&mut self) {
        self.working.width = self.working.width.max(MIN_OVERLAY_WIDTH);
        self.working.height = self.working.height.max(MIN_OVERLAY_HEIGHT);
        if let Some(dims) = self.dimensions.get(self.page_number) {
            let max_width = (dims.display_width - self.working.x).max(MIN_OVERLAY_WIDTH);
            let max_height = (dims.display_height - self.working.y).max(MIN_OVERLAY_HEIGHT);
            self.working.width = self.working.width.min(max_width);
            self.working.height = self.working.height.min(max_height);
        }
    }
}
