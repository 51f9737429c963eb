//! Synthetic render engine
//!
//! A self-contained [`RenderEngine`] that draws flat-colored pages.
//! It backs this crate's tests and the session crate's tests, and gives
//! downstream consumers a working default while a real engine binding
//! is wired up. Gates and failure injection make cancellation races
//! reproducible: a gated page parks at its render call until released,
//! which is exactly the window in which slot parameters change out from
//! under an in-flight task.

use crate::cancel::CancellationToken;
use crate::engine::{DocumentPage, EngineError, PageSize, PixelSurface, RenderEngine, RenderViewport};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Builder-style synthetic document engine
pub struct SyntheticEngine {
    pages: Vec<PageSize>,
    gate: Option<Arc<Notify>>,
    failing_pages: Mutex<HashSet<u32>>,
    render_calls: Arc<AtomicUsize>,
    ignore_cancellation: bool,
    fill: [u8; 4],
}

impl SyntheticEngine {
    /// A document of `page_count` identical pages
    pub fn uniform(page_count: u32, size: PageSize) -> Self {
        Self {
            pages: vec![size; page_count as usize],
            gate: None,
            failing_pages: Mutex::new(HashSet::new()),
            render_calls: Arc::new(AtomicUsize::new(0)),
            ignore_cancellation: false,
            fill: [0xe8, 0xe8, 0xe8, 0xff],
        }
    }

    /// A document with explicit per-page sizes
    pub fn with_pages(pages: Vec<PageSize>) -> Self {
        Self {
            pages,
            gate: None,
            failing_pages: Mutex::new(HashSet::new()),
            render_calls: Arc::new(AtomicUsize::new(0)),
            ignore_cancellation: false,
            fill: [0xe8, 0xe8, 0xe8, 0xff],
        }
    }

    /// Park every draw call until [`release_one`](Self::release_one)
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Model an engine that never observes the cancellation token
    ///
    /// Draws run to completion even when cancelled, forcing callers to
    /// rely on their own post-suspension re-validation.
    pub fn ignoring_cancellation(mut self) -> Self {
        self.ignore_cancellation = true;
        self
    }

    /// Make draws of `page_number` fail with a render error
    pub fn failing_page(self, page_number: u32) -> Self {
        self.failing_pages.lock().unwrap().insert(page_number);
        self
    }

    /// Fill color for rendered pages
    pub fn with_fill(mut self, rgba: [u8; 4]) -> Self {
        self.fill = rgba;
        self
    }

    /// Release one parked draw call (no-op when not gated)
    pub fn release_one(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Total number of draw calls the engine has served
    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }
}

impl RenderEngine for SyntheticEngine {
    type Page = SyntheticPage;

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn page(&self, page_number: u32) -> Result<SyntheticPage, EngineError> {
        let page_count = self.page_count();
        let Some(size) = page_number
            .checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
        else {
            return Err(EngineError::PageOutOfRange {
                page: page_number,
                page_count,
            });
        };

        Ok(SyntheticPage {
            page_number,
            size: *size,
            gate: self.gate.clone(),
            fails: self
                .failing_pages
                .lock()
                .unwrap()
                .contains(&page_number),
            calls: Arc::clone(&self.render_calls),
            ignore_cancellation: self.ignore_cancellation,
            fill: self.fill,
        })
    }
}

/// One page of a synthetic document
pub struct SyntheticPage {
    page_number: u32,
    size: PageSize,
    gate: Option<Arc<Notify>>,
    fails: bool,
    calls: Arc<AtomicUsize>,
    ignore_cancellation: bool,
    fill: [u8; 4],
}

impl DocumentPage for SyntheticPage {
    fn native_size(&self) -> PageSize {
        self.size
    }

    async fn render_into(
        &self,
        surface: &mut PixelSurface,
        _viewport: &RenderViewport,
        token: &CancellationToken,
    ) -> Result<(), EngineError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if token.is_cancelled() && !self.ignore_cancellation {
            return Err(EngineError::Cancelled);
        }

        if self.fails {
            return Err(EngineError::Render(format!(
                "synthetic draw failure on page {}",
                self.page_number
            )));
        }

        self.calls.fetch_add(1, Ordering::SeqCst);

        for pixel in surface.pixels_mut().chunks_exact_mut(4) {
            pixel.copy_from_slice(&self.fill);
        }

        Ok(())
    }
}
