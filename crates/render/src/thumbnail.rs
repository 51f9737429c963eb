//! Thumbnail prefetching for the page navigator
//!
//! Renders small-scale bitmaps for pages around the current one so the
//! sidebar fills in as the user navigates. Requests are deduplicated
//! (a page already cached or already in flight is never re-requested)
//! and navigation is debounced so paging quickly through a document
//! only prefetches around where the user lands. A failed thumbnail is
//! logged and skipped; it never blocks the others.

use crate::cancel::CancellationToken;
use crate::engine::{Bitmap, DocumentPage, EngineError, PixelSurface, RenderEngine, RenderViewport};
use sign_viewer_geometry::{prefetch_window, Debouncer};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Fixed scale for sidebar thumbnails
pub const THUMBNAIL_SCALE: f64 = 0.2;

/// Default number of pages prefetched on each side of the current page
pub const DEFAULT_PREFETCH_RADIUS: u32 = 2;

struct PrefetchState {
    thumbnails: HashMap<u32, Arc<Bitmap>>,
    in_flight: HashSet<u32>,
    navigation: Debouncer<u32>,
}

/// Background thumbnail generator
///
/// Drive it with `navigate` on page changes, `take_due` from the event
/// loop to collect pages whose debounce window elapsed, and `fetch` to
/// render each one.
pub struct ThumbnailPrefetcher<E: RenderEngine> {
    engine: Arc<E>,
    radius: u32,
    state: Mutex<PrefetchState>,
}

impl<E: RenderEngine> ThumbnailPrefetcher<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self::with_radius(engine, DEFAULT_PREFETCH_RADIUS)
    }

    pub fn with_radius(engine: Arc<E>, radius: u32) -> Self {
        Self {
            engine,
            radius,
            state: Mutex::new(PrefetchState {
                thumbnails: HashMap::new(),
                in_flight: HashSet::new(),
                navigation: Debouncer::default(),
            }),
        }
    }

    /// Record a navigation; prefetch targets settle after the quiet window
    pub fn navigate(&self, current_page: u32, now: Instant) {
        let mut state = self.state.lock().unwrap();
        state.navigation.submit(current_page, now);
    }

    /// Pages due for prefetching, marked in-flight on return
    ///
    /// Pages already cached or in flight are filtered out. Returns an
    /// empty vec while the navigation debounce is still settling.
    pub fn take_due(&self, now: Instant) -> Vec<u32> {
        let mut state = self.state.lock().unwrap();
        let Some(current_page) = state.navigation.poll(now) else {
            return Vec::new();
        };

        let pages: Vec<u32> = prefetch_window(current_page, self.engine.page_count(), self.radius)
            .into_iter()
            .filter(|page| {
                !state.thumbnails.contains_key(page) && !state.in_flight.contains(page)
            })
            .collect();

        for page in &pages {
            state.in_flight.insert(*page);
        }
        pages
    }

    /// Render one thumbnail
    ///
    /// Returns the bitmap on success. Failures are logged per page and
    /// reported as `None`; the in-flight mark is cleared either way so
    /// the page can be retried on a later navigation.
    pub async fn fetch(&self, page_number: u32) -> Option<Arc<Bitmap>> {
        let result = self.render_thumbnail(page_number).await;

        let mut state = self.state.lock().unwrap();
        state.in_flight.remove(&page_number);

        match result {
            Ok(bitmap) => {
                let bitmap = Arc::new(bitmap);
                state.thumbnails.insert(page_number, Arc::clone(&bitmap));
                Some(bitmap)
            }
            Err(error) => {
                log::warn!("thumbnail for page {page_number} failed: {error}");
                None
            }
        }
    }

    /// Cached thumbnail for a page, if generated
    pub fn get(&self, page_number: u32) -> Option<Arc<Bitmap>> {
        let state = self.state.lock().unwrap();
        state.thumbnails.get(&page_number).cloned()
    }

    /// Whether a page's thumbnail is cached
    pub fn contains(&self, page_number: u32) -> bool {
        let state = self.state.lock().unwrap();
        state.thumbnails.contains_key(&page_number)
    }

    /// Number of cached thumbnails
    pub fn len(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.thumbnails.len()
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.thumbnails.is_empty()
    }

    /// Drop all cached thumbnails (session teardown)
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.thumbnails.clear();
        state.in_flight.clear();
    }

    async fn render_thumbnail(&self, page_number: u32) -> Result<Bitmap, EngineError> {
        let page = self.engine.page(page_number).await?;
        let viewport = RenderViewport::for_page(page.native_size(), THUMBNAIL_SCALE);

        let mut surface = PixelSurface::new(viewport.pixel_width(), viewport.pixel_height());
        surface.fill_white();

        // Thumbnails are never superseded, only skipped; a fresh token
        // per render keeps the engine contract uniform.
        page.render_into(&mut surface, &viewport, &CancellationToken::new())
            .await?;

        Ok(surface.into_bitmap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PageSize;
    use crate::synthetic::SyntheticEngine;
    use std::time::Duration;

    const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    fn prefetcher(engine: SyntheticEngine) -> ThumbnailPrefetcher<SyntheticEngine> {
        ThumbnailPrefetcher::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn navigation_settles_into_a_prefetch_window() {
        let p = prefetcher(SyntheticEngine::uniform(10, LETTER));
        let start = Instant::now();

        p.navigate(5, start);
        assert!(p.take_due(start).is_empty());

        let due = p.take_due(start + Duration::from_millis(100));
        assert_eq!(due, vec![5, 4, 6, 3, 7]);
    }

    #[tokio::test]
    async fn rapid_navigation_prefetches_only_around_the_destination() {
        let p = prefetcher(SyntheticEngine::uniform(20, LETTER));
        let start = Instant::now();

        for (step, page) in [2, 5, 9, 14].into_iter().enumerate() {
            p.navigate(page, start + Duration::from_millis(step as u64 * 20));
        }

        let due = p.take_due(start + Duration::from_millis(60 + 100));
        assert_eq!(due, vec![14, 13, 15, 12, 16]);
    }

    #[tokio::test]
    async fn cached_and_in_flight_pages_are_not_re_requested() {
        let p = prefetcher(SyntheticEngine::uniform(10, LETTER));
        let start = Instant::now();

        p.navigate(5, start);
        let first = p.take_due(start + Duration::from_millis(100));
        assert_eq!(first.len(), 5);

        // Everything from the first window is in flight; fetch two of
        // them to completion.
        p.fetch(5).await.unwrap();
        p.fetch(4).await.unwrap();
        assert_eq!(p.len(), 2);

        // The same window again: cached (5, 4) and in-flight (6, 3, 7)
        // pages are all excluded.
        p.navigate(5, start + Duration::from_millis(200));
        let second = p.take_due(start + Duration::from_millis(300));
        assert!(second.is_empty());

        assert_eq!(p.engine.render_calls(), 2);
    }

    #[tokio::test]
    async fn thumbnail_bitmaps_use_the_fixed_small_scale() {
        let p = prefetcher(SyntheticEngine::uniform(3, LETTER));
        let bitmap = p.fetch(1).await.unwrap();

        // 612 * 0.2 = 122.4 -> 123 px wide.
        assert_eq!(bitmap.width, 123);
        assert_eq!(bitmap.height, 159);
        assert!(Arc::ptr_eq(&bitmap, &p.get(1).unwrap()));
    }

    #[tokio::test]
    async fn a_failed_page_does_not_block_the_others() {
        let p = prefetcher(SyntheticEngine::uniform(5, LETTER).failing_page(3));
        let start = Instant::now();

        p.navigate(3, start);
        let due = p.take_due(start + Duration::from_millis(100));
        assert_eq!(due, vec![3, 2, 4, 1, 5]);

        for page in due {
            p.fetch(page).await;
        }

        assert!(!p.contains(3));
        assert!(p.contains(2));
        assert!(p.contains(4));
        assert_eq!(p.len(), 4);
    }

    #[tokio::test]
    async fn failed_pages_can_be_retried_after_renavigation() {
        let p = prefetcher(SyntheticEngine::uniform(3, LETTER).failing_page(2));
        let start = Instant::now();

        p.navigate(2, start);
        let due = p.take_due(start + Duration::from_millis(100));
        assert!(due.contains(&2));
        p.fetch(2).await;

        // The failure cleared the in-flight mark, so a later navigation
        // requests page 2 again.
        p.navigate(2, start + Duration::from_millis(200));
        let retry = p.take_due(start + Duration::from_millis(300));
        assert!(retry.contains(&2));
    }

    #[tokio::test]
    async fn clear_drops_thumbnails_and_marks() {
        let p = prefetcher(SyntheticEngine::uniform(3, LETTER));
        p.fetch(1).await.unwrap();
        assert!(!p.is_empty());

        p.clear();
        assert!(p.is_empty());
        assert!(p.get(1).is_none());
    }
}
