//! Cancellable page rendering with per-slot supersession
//!
//! A slot is the UI element responsible for one page number. At most
//! one render task is current per slot: starting a new render cancels
//! whatever was in flight and bumps the slot generation. After every
//! suspension point the task re-validates that it is still the slot's
//! current task; a task that lost the slot discards its result without
//! mutating the cache or the dimension store, so a late arrival can
//! never clobber the state of whatever the slot now shows.

use crate::cache::{RenderCache, RenderKey};
use crate::cancel::CancellationToken;
use crate::engine::{Bitmap, DocumentPage, EngineError, PixelSurface, RenderEngine, RenderViewport};
use sign_viewer_geometry::{DimensionStore, PageDimensions};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Target of one render request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    /// 1-based page number
    pub page_number: u32,

    /// Zoom scale relative to the native page size
    pub scale: f64,

    /// Width of the scroll container in pixels; participates in the
    /// cache key because layout reflows re-rasterize pages
    pub container_width: u32,
}

impl RenderParams {
    pub fn new(page_number: u32, scale: f64, container_width: u32) -> Self {
        Self {
            page_number,
            scale,
            container_width,
        }
    }

    fn cache_key(&self) -> RenderKey {
        RenderKey::new(self.page_number, self.scale, self.container_width)
    }
}

/// Identifier of a page slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

/// Lifecycle of a slot's current render
///
/// `Cancelled` and `Failed` return to `Rendering` on the next request;
/// `Committed` stands until the slot's parameters change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    Idle,
    Rendering,
    Committed,
    Cancelled,
    Failed,
}

/// Result of a render request
#[derive(Debug)]
pub enum RenderOutcome {
    /// The result was published to the cache and dimension store
    Committed {
        dimensions: PageDimensions,
        bitmap: Arc<Bitmap>,
        from_cache: bool,
    },

    /// The task was superseded or cancelled; nothing was published
    Discarded,
}

/// Render failure local to one slot
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to render page {page_number}: {source}")]
    Render {
        page_number: u32,
        #[source]
        source: EngineError,
    },
}

struct SlotState {
    generation: u64,
    token: CancellationToken,
    phase: SlotPhase,
}

/// Claim on a slot held by one render task
struct RenderTicket {
    slot: SlotId,
    generation: u64,
    token: CancellationToken,
}

/// Renders pages through the engine, publishing into a shared cache and
/// dimension store
pub struct PageRenderer<E: RenderEngine> {
    engine: Arc<E>,
    cache: Arc<RenderCache>,
    dimensions: DimensionStore,
    slots: Mutex<HashMap<SlotId, SlotState>>,
    generations: AtomicU64,
}

impl<E: RenderEngine> PageRenderer<E> {
    pub fn new(engine: Arc<E>, cache: Arc<RenderCache>, dimensions: DimensionStore) -> Self {
        Self {
            engine,
            cache,
            dimensions,
            slots: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn cache(&self) -> &Arc<RenderCache> {
        &self.cache
    }

    pub fn dimensions(&self) -> &DimensionStore {
        &self.dimensions
    }

    /// Current phase of a slot, if it has ever rendered
    pub fn slot_phase(&self, slot: SlotId) -> SlotPhase {
        let slots = self.slots.lock().unwrap();
        slots.get(&slot).map_or(SlotPhase::Idle, |state| state.phase)
    }

    /// Cancel whatever the slot has in flight
    pub fn cancel_slot(&self, slot: SlotId) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(state) = slots.get_mut(&slot) {
            state.token.cancel();
            if state.phase == SlotPhase::Rendering {
                state.phase = SlotPhase::Cancelled;
            }
        }
    }

    /// Render a page for a slot
    ///
    /// Supersedes any render already in flight for the slot. Returns
    /// `Committed` when the result was published, `Discarded` when the
    /// task lost the slot along the way (expected, not an error), and
    /// `Err` when the engine failed, in which case the slot is marked
    /// `Failed` and other slots are unaffected.
    pub async fn render(
        &self,
        slot: SlotId,
        params: RenderParams,
    ) -> Result<RenderOutcome, RenderError> {
        let ticket = self.begin(slot);
        let key = params.cache_key();

        // A hit must hand back the identical bitmap without touching
        // the engine. Dimensions were published by the render that
        // created the entry; if they are gone the entry is stale and we
        // fall through to a full render.
        if let Some(bitmap) = self.cache.get(&key) {
            if let Some(dimensions) = self.dimensions.get(params.page_number) {
                self.finish(&ticket, SlotPhase::Committed);
                return Ok(RenderOutcome::Committed {
                    dimensions,
                    bitmap,
                    from_cache: true,
                });
            }
        }

        let page = match self.engine.page(params.page_number).await {
            Ok(page) => page,
            Err(EngineError::Cancelled) => {
                self.finish(&ticket, SlotPhase::Cancelled);
                return Ok(RenderOutcome::Discarded);
            }
            Err(source) => {
                self.finish(&ticket, SlotPhase::Failed);
                return Err(RenderError::Render {
                    page_number: params.page_number,
                    source,
                });
            }
        };

        if !self.is_current(&ticket) {
            log::debug!(
                "render of page {} discarded after page fetch (slot superseded)",
                params.page_number
            );
            return Ok(RenderOutcome::Discarded);
        }

        // Native viewport at scale 1 for dimension bookkeeping, display
        // viewport at the requested scale for the raster.
        let native = page.native_size();
        let viewport = RenderViewport::for_page(native, params.scale);

        let mut surface = PixelSurface::new(viewport.pixel_width(), viewport.pixel_height());
        surface.fill_white();

        match page.render_into(&mut surface, &viewport, &ticket.token).await {
            Ok(()) => {}
            Err(EngineError::Cancelled) => {
                log::debug!("render of page {} cancelled by engine", params.page_number);
                self.finish(&ticket, SlotPhase::Cancelled);
                return Ok(RenderOutcome::Discarded);
            }
            Err(source) => {
                log::warn!("page {} failed to render: {source}", params.page_number);
                self.finish(&ticket, SlotPhase::Failed);
                return Err(RenderError::Render {
                    page_number: params.page_number,
                    source,
                });
            }
        }

        if !self.is_current(&ticket) {
            log::debug!(
                "render of page {} discarded after draw (slot superseded)",
                params.page_number
            );
            return Ok(RenderOutcome::Discarded);
        }

        let dimensions = PageDimensions::from_native(native.width, native.height, params.scale);
        let bitmap = Arc::new(surface.into_bitmap());

        self.cache.put(key, Arc::clone(&bitmap));
        self.dimensions.insert(params.page_number, dimensions);
        self.finish(&ticket, SlotPhase::Committed);

        Ok(RenderOutcome::Committed {
            dimensions,
            bitmap,
            from_cache: false,
        })
    }

    /// Claim the slot: cancel the in-flight task and install a fresh
    /// token under a new generation
    fn begin(&self, slot: SlotId) -> RenderTicket {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();

        let mut slots = self.slots.lock().unwrap();
        if let Some(previous) = slots.insert(
            slot,
            SlotState {
                generation,
                token: token.clone(),
                phase: SlotPhase::Rendering,
            },
        ) {
            previous.token.cancel();
        }

        RenderTicket {
            slot,
            generation,
            token,
        }
    }

    /// Whether the ticket still owns its slot
    fn is_current(&self, ticket: &RenderTicket) -> bool {
        if ticket.token.is_cancelled() {
            return false;
        }
        let slots = self.slots.lock().unwrap();
        slots
            .get(&ticket.slot)
            .is_some_and(|state| state.generation == ticket.generation)
    }

    /// Record the terminal phase, unless the slot has moved on
    fn finish(&self, ticket: &RenderTicket, phase: SlotPhase) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(state) = slots.get_mut(&ticket.slot) {
            if state.generation == ticket.generation {
                state.phase = phase;
            }
        }
    }
}
