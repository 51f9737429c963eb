//! Viewer session state
//!
//! One open document: the render pipeline, the page layout and scroll
//! tracking, the overlay list, and the thumbnail prefetcher, wired
//! together behind a single facade. Zoom changes flush the render cache
//! before any new render starts, so a stale raster can never be served
//! at the new scale.

use crate::export::{self, PlacementRecord};
use sign_viewer_geometry::{DimensionStore, ViewportTracker};
use sign_viewer_overlay::{
    place_overlay, ImageRef, OverlayController, OverlayId, OverlayList, Point,
};
use sign_viewer_render::{
    Bitmap, PageRenderer, RenderCache, RenderEngine, RenderError, RenderOutcome, RenderParams,
    SlotId, ThumbnailPrefetcher,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Scale a document opens at
pub const DEFAULT_SCALE: f64 = 1.5;

/// Zoom bounds and step for `zoom_in` / `zoom_out`
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.2;

/// Default display size of a newly placed overlay
pub const DEFAULT_OVERLAY_WIDTH: f64 = 150.0;
pub const DEFAULT_OVERLAY_HEIGHT: f64 = 80.0;

// Letter-page height at the default scale; stands in for a page's band
// until its first render reports the real size.
const INITIAL_PAGE_HEIGHT: f64 = 792.0 * DEFAULT_SCALE;

/// Session failure
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("document has no pages")]
    EmptyDocument,

    #[error("session is closed")]
    Closed,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to serialize placements: {0}")]
    Export(#[from] serde_json::Error),
}

/// An open document and everything the viewer tracks for it
pub struct ViewerSession<E: RenderEngine> {
    engine: Arc<E>,
    renderer: Arc<PageRenderer<E>>,
    cache: Arc<RenderCache>,
    dimensions: DimensionStore,
    overlays: OverlayList,
    // Behind a lock, never held across an await: render tasks for
    // different slots run as concurrent futures over &self.
    tracker: Mutex<ViewportTracker>,
    thumbnails: ThumbnailPrefetcher<E>,
    scale: f64,
    container_width: u32,
    page_count: u32,
    closed: bool,
}

impl<E: RenderEngine> ViewerSession<E> {
    /// Open a document
    ///
    /// `container_width` and `viewport_height` describe the scroll
    /// container in display pixels.
    pub fn open(
        engine: E,
        container_width: u32,
        viewport_height: f64,
    ) -> Result<Self, SessionError> {
        let page_count = engine.page_count();
        if page_count == 0 {
            return Err(SessionError::EmptyDocument);
        }

        let engine = Arc::new(engine);
        let cache = Arc::new(RenderCache::new());
        let dimensions = DimensionStore::new();
        let renderer = Arc::new(PageRenderer::new(
            Arc::clone(&engine),
            Arc::clone(&cache),
            dimensions.clone(),
        ));
        let thumbnails = ThumbnailPrefetcher::new(Arc::clone(&engine));
        let tracker = Mutex::new(ViewportTracker::new(
            vec![INITIAL_PAGE_HEIGHT; page_count as usize],
            viewport_height,
        ));

        log::info!("opened document with {page_count} pages at scale {DEFAULT_SCALE}");

        Ok(Self {
            engine,
            renderer,
            cache,
            dimensions,
            overlays: OverlayList::new(),
            tracker,
            thumbnails,
            scale: DEFAULT_SCALE,
            container_width,
            page_count,
            closed: false,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn container_width(&self) -> u32 {
        self.container_width
    }

    pub fn overlays(&self) -> &OverlayList {
        &self.overlays
    }

    pub fn dimensions(&self) -> &DimensionStore {
        &self.dimensions
    }

    pub fn cache(&self) -> &Arc<RenderCache> {
        &self.cache
    }

    /// Set the zoom scale, clamped to the supported range
    ///
    /// The cache is flushed before returning so every render after this
    /// call rasterizes (or re-caches) at the new scale.
    pub fn set_scale(&mut self, scale: f64) {
        let clamped = scale.clamp(MIN_SCALE, MAX_SCALE);
        if clamped == self.scale {
            return;
        }

        log::debug!("scale {} -> {clamped}, flushing render cache", self.scale);
        self.cache.flush();
        self.scale = clamped;

        // Re-derive the layout for pages we know the native size of;
        // the rest keep the placeholder until they render.
        let heights: Vec<f64> = (1..=self.page_count)
            .map(|page| {
                self.dimensions
                    .get(page)
                    .map(|dims| dims.native_height * clamped)
                    .unwrap_or(INITIAL_PAGE_HEIGHT)
            })
            .collect();
        self.tracker.lock().unwrap().replace_layout(heights);
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale - ZOOM_STEP);
    }

    /// Record a container reflow; takes effect on the next renders
    ///
    /// No flush needed: the container width is part of the cache key,
    /// so entries for the old width simply stop being hit.
    pub fn set_container_width(&mut self, width: u32) {
        self.container_width = width;
    }

    pub fn set_viewport_height(&self, height: f64) {
        self.tracker.lock().unwrap().set_viewport_height(height);
    }

    /// Record a scroll position; committed after the quiet window
    pub fn set_scroll(&self, offset: f64, now: Instant) {
        self.tracker.lock().unwrap().set_scroll(offset, now);
    }

    /// Commit a due scroll position, returning pages whose render
    /// eligibility changed
    pub fn poll_viewport(&self, now: Instant) -> Option<Vec<u32>> {
        self.tracker.lock().unwrap().poll(now)
    }

    pub fn flush_viewport(&self) -> Option<Vec<u32>> {
        self.tracker.lock().unwrap().flush()
    }

    pub fn should_render(&self, page_number: u32) -> bool {
        self.tracker.lock().unwrap().should_render(page_number)
    }

    pub fn eligible_pages(&self) -> Vec<u32> {
        self.tracker.lock().unwrap().eligible_pages()
    }

    /// Render a page into a slot if the viewport makes it eligible
    ///
    /// Returns `None` without touching the renderer when the page is
    /// outside the margin-expanded visible region. On a committed
    /// render the page's overlays are resynced to the fresh dimensions
    /// and its layout band updated.
    ///
    /// Takes `&self` so renders for different slots run as concurrent
    /// futures; one slow page never blocks the others or any session
    /// interaction.
    pub async fn render_page(
        &self,
        slot: SlotId,
        page_number: u32,
    ) -> Result<Option<RenderOutcome>, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if !self.should_render(page_number) {
            return Ok(None);
        }

        let params = RenderParams::new(page_number, self.scale, self.container_width);
        let outcome = self.renderer.render(slot, params).await?;

        if let RenderOutcome::Committed { dimensions, .. } = &outcome {
            self.overlays.resync_page(page_number, dimensions);
            self.tracker
                .lock()
                .unwrap()
                .set_page_height(page_number, dimensions.display_height);
        }

        Ok(Some(outcome))
    }

    /// Cancel whatever a slot has in flight (page scrolled away)
    pub fn cancel_slot(&self, slot: SlotId) {
        self.renderer.cancel_slot(slot);
    }

    /// Place a signature overlay at a display-space position
    ///
    /// Requires the page to have rendered at least once; without its
    /// dimensions the normalized coordinates cannot be captured.
    pub fn place_overlay(
        &self,
        page_number: u32,
        position: Point,
        image_ref: ImageRef,
    ) -> Option<OverlayId> {
        let Some(dims) = self.dimensions.get(page_number) else {
            log::debug!("page {page_number} has no dimensions yet, overlay placement skipped");
            return None;
        };
        let overlay = place_overlay(
            page_number,
            position,
            DEFAULT_OVERLAY_WIDTH,
            DEFAULT_OVERLAY_HEIGHT,
            image_ref,
            &dims,
        );
        Some(self.overlays.place(overlay))
    }

    /// Gesture controller for an overlay
    pub fn controller(&self, id: OverlayId) -> Option<OverlayController> {
        OverlayController::attach(id, self.overlays.clone(), self.dimensions.clone())
    }

    /// Remove an overlay; `false` if the id is unknown
    pub fn remove_overlay(&self, id: OverlayId) -> bool {
        self.overlays.remove(id).is_some()
    }

    /// Record a page navigation for thumbnail prefetching
    pub fn navigate(&self, page_number: u32, now: Instant) {
        self.thumbnails.navigate(page_number, now);
    }

    /// Thumbnail pages due for prefetching
    pub fn due_thumbnails(&self, now: Instant) -> Vec<u32> {
        self.thumbnails.take_due(now)
    }

    /// Render one thumbnail
    pub async fn fetch_thumbnail(&self, page_number: u32) -> Option<Arc<Bitmap>> {
        self.thumbnails.fetch(page_number).await
    }

    pub fn thumbnail(&self, page_number: u32) -> Option<Arc<Bitmap>> {
        self.thumbnails.get(page_number)
    }

    /// Placement records for every overlay, in placement order
    ///
    /// Overlays on pages that never rendered are skipped with a
    /// warning.
    pub fn finalize(&self) -> Vec<PlacementRecord> {
        export::placements(&self.overlays, &self.dimensions)
    }

    /// Placement records serialized as JSON
    pub fn finalize_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(&self.finalize())?)
    }

    /// Tear the session down
    ///
    /// Flushes the render cache and drops per-page state; the overlay
    /// list survives so a pending `finalize` can still read it.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cache.flush();
        self.dimensions.clear();
        self.thumbnails.clear();
        log::info!("session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }
}
