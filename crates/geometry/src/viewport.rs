//! Viewport tracking for lazy page rendering
//!
//! Decides which pages the renderer should work on: a page is eligible
//! when its band intersects the scroll container's visible region
//! expanded by a look-ahead margin, so pages about to scroll into view
//! are pre-rendered. Scroll updates are debounced so rapid scrolling
//! does not thrash render/cancel cycles.
//!
//! Losing eligibility never clears already-rendered content, it only
//! withholds new render requests.

use crate::debounce::{Debouncer, DEFAULT_DEBOUNCE_WINDOW};
use std::time::Instant;

/// Default look-ahead margin in display pixels
pub const DEFAULT_LOOKAHEAD_MARGIN: f64 = 400.0;

/// Default spacing between page bands in display pixels
const DEFAULT_PAGE_SPACING: f64 = 16.0;

/// Tracks the visible scroll region against the page layout
///
/// Pages are 1-based. The layout is an ordered list of page heights in
/// display pixels; it is replaced whenever zoom or container width
/// changes the rendered page sizes.
#[derive(Debug)]
pub struct ViewportTracker {
    page_heights: Vec<f64>,
    page_spacing: f64,
    viewport_height: f64,
    lookahead_margin: f64,
    scroll_offset: f64,
    scroll_debounce: Debouncer<f64>,
}

impl ViewportTracker {
    /// Create a tracker for the given page layout and viewport height
    pub fn new(page_heights: Vec<f64>, viewport_height: f64) -> Self {
        Self {
            page_heights,
            page_spacing: DEFAULT_PAGE_SPACING,
            viewport_height,
            lookahead_margin: DEFAULT_LOOKAHEAD_MARGIN,
            scroll_offset: 0.0,
            scroll_debounce: Debouncer::new(DEFAULT_DEBOUNCE_WINDOW),
        }
    }

    /// Override the look-ahead margin
    pub fn with_lookahead_margin(mut self, margin: f64) -> Self {
        self.lookahead_margin = margin;
        self
    }

    /// Override the inter-page spacing
    pub fn with_page_spacing(mut self, spacing: f64) -> Self {
        self.page_spacing = spacing;
        self
    }

    /// Number of pages in the layout
    pub fn page_count(&self) -> u32 {
        self.page_heights.len() as u32
    }

    /// The committed scroll offset
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Record a scroll position; committed after the quiet window
    pub fn set_scroll(&mut self, offset: f64, now: Instant) {
        self.scroll_debounce.submit(offset.max(0.0), now);
    }

    /// Commit the most recent scroll position if its window elapsed
    ///
    /// Returns the pages whose eligibility changed with the commit, or
    /// `None` if nothing was due.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<u32>> {
        let offset = self.scroll_debounce.poll(now)?;
        Some(self.commit_scroll(offset))
    }

    /// Commit any pending scroll position immediately
    pub fn flush(&mut self) -> Option<Vec<u32>> {
        let offset = self.scroll_debounce.flush()?;
        Some(self.commit_scroll(offset))
    }

    /// Replace the page layout (zoom or container-width change)
    ///
    /// Takes effect immediately; the committed scroll offset is kept.
    pub fn replace_layout(&mut self, page_heights: Vec<f64>) {
        self.page_heights = page_heights;
    }

    /// Update the height of a single page band (after it re-renders)
    pub fn set_page_height(&mut self, page_number: u32, height: f64) {
        if page_number == 0 {
            return;
        }
        if let Some(slot) = self.page_heights.get_mut(page_number as usize - 1) {
            *slot = height;
        }
    }

    /// Update the viewport height (container resize)
    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height;
    }

    /// Whether a page intersects the margin-expanded visible region
    pub fn should_render(&self, page_number: u32) -> bool {
        let Some((band_start, band_end)) = self.page_band(page_number) else {
            return false;
        };

        let region_start = self.scroll_offset - self.lookahead_margin;
        let region_end = self.scroll_offset + self.viewport_height + self.lookahead_margin;

        band_end > region_start && band_start < region_end
    }

    /// All pages currently eligible for rendering
    pub fn eligible_pages(&self) -> Vec<u32> {
        (1..=self.page_count())
            .filter(|page| self.should_render(*page))
            .collect()
    }

    fn commit_scroll(&mut self, offset: f64) -> Vec<u32> {
        let before = self.eligible_pages();
        self.scroll_offset = offset;
        let after = self.eligible_pages();

        let mut changed: Vec<u32> = before
            .iter()
            .filter(|page| !after.contains(page))
            .chain(after.iter().filter(|page| !before.contains(page)))
            .copied()
            .collect();
        changed.sort_unstable();
        changed
    }

    /// Start/end offsets of a page's band, pages stacked with spacing
    fn page_band(&self, page_number: u32) -> Option<(f64, f64)> {
        if page_number == 0 || page_number > self.page_count() {
            return None;
        }

        let mut cursor = 0.0;
        for (index, height) in self.page_heights.iter().enumerate() {
            if index as u32 + 1 == page_number {
                return Some((cursor, cursor + height));
            }
            cursor += height + self.page_spacing;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn tracker(pages: usize) -> ViewportTracker {
        ViewportTracker::new(vec![1000.0; pages], 800.0)
            .with_page_spacing(100.0)
            .with_lookahead_margin(400.0)
    }

    #[test]
    fn visible_pages_plus_margin_are_eligible() {
        let t = tracker(10);

        // At offset 0 the viewport covers page 1 (0..1000); the margin
        // reaches down to 1200, which is inside page 2's band (1100..2100).
        assert!(t.should_render(1));
        assert!(t.should_render(2));
        assert!(!t.should_render(3));
        assert_eq!(t.eligible_pages(), vec![1, 2]);
    }

    #[test]
    fn distant_page_becomes_eligible_only_within_margin() {
        let mut t = tracker(12);
        let start = Instant::now();

        // Page 10 starts at 9 * 1100 = 9900. The expanded region reaches
        // scroll + 800 + 400, so eligibility begins at scroll > 8700.
        t.set_scroll(8600.0, start);
        t.poll(start + Duration::from_millis(100));
        assert!(!t.should_render(10));

        t.set_scroll(8701.0, start + Duration::from_millis(200));
        t.poll(start + Duration::from_millis(300));
        assert!(t.should_render(10));
    }

    #[test]
    fn rapid_scrolling_coalesces_to_final_position() {
        let mut t = tracker(20);
        let start = Instant::now();

        // Sweep past many pages quickly; only the last position commits.
        for step in 0..10 {
            t.set_scroll(step as f64 * 2000.0, start + Duration::from_millis(step * 10));
            assert_eq!(t.poll(start + Duration::from_millis(step * 10)), None);
        }

        let changed = t.poll(start + Duration::from_millis(90 + 100)).unwrap();
        assert!(!changed.is_empty());
        assert_eq!(t.scroll_offset(), 18_000.0);

        // Intermediate positions never became eligible: page 2's band
        // (1100..2100) is far behind the committed region.
        assert!(!t.should_render(2));
    }

    #[test]
    fn commit_reports_pages_whose_eligibility_changed() {
        let mut t = tracker(10);
        let start = Instant::now();

        t.set_scroll(3300.0, start);
        let changed = t.poll(start + Duration::from_millis(100)).unwrap();

        // Viewport now covers 3300..4100, margin 2900..4500: pages 3-5
        // (bands 2200..3200, 3300..4300, 4400..5400). Pages 1-2 left,
        // pages 3-5 entered... page 3 band ends 3200 > 2900 so eligible.
        assert!(changed.contains(&1));
        assert!(changed.contains(&2));
        assert!(changed.contains(&4));
        assert_eq!(t.eligible_pages(), vec![3, 4, 5]);
    }

    #[test]
    fn losing_eligibility_withholds_without_reporting_stale_pages() {
        let mut t = tracker(5);
        let start = Instant::now();

        assert!(t.should_render(1));

        t.set_scroll(4000.0, start);
        t.poll(start + Duration::from_millis(100));

        assert!(!t.should_render(1));
        // Tracker only gates renders; cached content retention is the
        // cache's concern.
    }

    #[test]
    fn layout_replacement_applies_immediately() {
        let mut t = tracker(3);
        assert_eq!(t.eligible_pages(), vec![1, 2]);

        // Zoom out: pages shrink, more fit in the viewport+margin.
        t.replace_layout(vec![400.0; 3]);
        assert_eq!(t.eligible_pages(), vec![1, 2, 3]);
    }

    #[test]
    fn single_page_height_update() {
        let mut t = tracker(3);
        t.set_page_height(2, 500.0);
        // Page 3's band moved up: 1100 + 600 = 1700 start.
        assert!(t.should_render(2));
        // Out-of-range updates are ignored.
        t.set_page_height(0, 1.0);
        t.set_page_height(99, 1.0);
        assert_eq!(t.page_count(), 3);
    }

    #[test]
    fn flush_commits_pending_scroll_immediately() {
        let mut t = tracker(10);
        let start = Instant::now();

        t.set_scroll(5000.0, start);
        assert_eq!(t.scroll_offset(), 0.0);

        t.flush().unwrap();
        assert_eq!(t.scroll_offset(), 5000.0);
    }

    #[test]
    fn out_of_range_pages_are_never_eligible() {
        let t = tracker(3);
        assert!(!t.should_render(0));
        assert!(!t.should_render(4));
    }
}
