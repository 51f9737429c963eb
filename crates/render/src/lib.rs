//! Document render pipeline
//!
//! Cancellable page rendering against a pluggable [`RenderEngine`], a
//! flush-on-zoom bitmap cache, and thumbnail prefetching for the page
//! navigator. Callers drive [`PageRenderer`] from their own tasks; the
//! last request for a slot always wins.

pub mod cache;
pub mod cancel;
pub mod engine;
pub mod renderer;
pub mod synthetic;
pub mod thumbnail;

pub use cache::{CacheStats, RenderCache, RenderKey};
pub use cancel::CancellationToken;
pub use engine::{
    Bitmap, DocumentPage, EngineError, PageSize, PixelSurface, RenderEngine, RenderViewport,
};
pub use renderer::{PageRenderer, RenderError, RenderOutcome, RenderParams, SlotId, SlotPhase};
pub use synthetic::SyntheticEngine;
pub use thumbnail::{ThumbnailPrefetcher, DEFAULT_PREFETCH_RADIUS, THUMBNAIL_SCALE};
