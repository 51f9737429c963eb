//! Per-page dimension records and coordinate transforms
//!
//! A page has two coordinate spaces: display space (pixels of the
//! currently rendered, scaled page) and native space (the document's
//! own units, equal to the viewport at scale 1). Overlay placements are
//! stored in native space so they survive zoom and container-width
//! changes; display values are always re-derived from native values,
//! never the other way around except at the moment a gesture commits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Dimension record for one rendered page
///
/// Produced by the page renderer each time a page (re-)renders and
/// overwritten wholesale. Invariant up to rounding:
/// `display_width == native_width * scale` (same for height).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    /// Rendered width in display pixels
    pub display_width: f64,

    /// Rendered height in display pixels
    pub display_height: f64,

    /// Page width in native document units (scale 1)
    pub native_width: f64,

    /// Page height in native document units (scale 1)
    pub native_height: f64,

    /// Scale the display values were rendered at
    pub scale: f64,
}

impl PageDimensions {
    /// Build a record from the native page size and a render scale
    pub fn from_native(native_width: f64, native_height: f64, scale: f64) -> Self {
        Self {
            display_width: native_width * scale,
            display_height: native_height * scale,
            native_width,
            native_height,
            scale,
        }
    }

    /// Convert a display-space x value to native units
    pub fn to_native_x(&self, display_x: f64) -> f64 {
        to_native(display_x, self.display_width, self.native_width)
    }

    /// Convert a display-space y value to native units
    pub fn to_native_y(&self, display_y: f64) -> f64 {
        to_native(display_y, self.display_height, self.native_height)
    }

    /// Convert a native-space x value to display pixels
    pub fn to_display_x(&self, native_x: f64) -> f64 {
        to_display(native_x, self.display_width, self.native_width)
    }

    /// Convert a native-space y value to display pixels
    pub fn to_display_y(&self, native_y: f64) -> f64 {
        to_display(native_y, self.display_height, self.native_height)
    }
}

/// Convert a display-space value to native units
///
/// Both extents must be positive; the round-trip through [`to_display`]
/// reproduces the input within floating-point tolerance.
pub fn to_native(display_value: f64, display_extent: f64, native_extent: f64) -> f64 {
    display_value / display_extent * native_extent
}

/// Convert a native-space value to display pixels
pub fn to_display(native_value: f64, display_extent: f64, native_extent: f64) -> f64 {
    native_value / native_extent * display_extent
}

/// Shared per-page dimension map
///
/// Written only by a render task whose re-validation check passed, read
/// by overlay commit code. A page is absent until its first successful
/// render completes, so readers must treat `get` returning `None` as
/// "page not rendered yet" and skip rather than substitute defaults.
#[derive(Debug, Clone, Default)]
pub struct DimensionStore {
    inner: Arc<Mutex<HashMap<u32, PageDimensions>>>,
}

impl DimensionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the dimension record for a page, replacing any previous one
    pub fn insert(&self, page_number: u32, dimensions: PageDimensions) {
        let mut map = self.inner.lock().unwrap();
        map.insert(page_number, dimensions);
    }

    /// Get the current record for a page, if it has rendered at least once
    pub fn get(&self, page_number: u32) -> Option<PageDimensions> {
        let map = self.inner.lock().unwrap();
        map.get(&page_number).copied()
    }

    /// Whether a page has a published record
    pub fn contains(&self, page_number: u32) -> bool {
        let map = self.inner.lock().unwrap();
        map.contains_key(&page_number)
    }

    /// Number of pages with published records
    pub fn len(&self) -> usize {
        let map = self.inner.lock().unwrap();
        map.len()
    }

    /// Whether no page has rendered yet
    pub fn is_empty(&self) -> bool {
        let map = self.inner.lock().unwrap();
        map.is_empty()
    }

    /// Drop all records (session teardown)
    pub fn clear(&self) {
        let mut map = self.inner.lock().unwrap();
        map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn from_native_applies_scale() {
        let dims = PageDimensions::from_native(612.0, 792.0, 2.0);
        assert_eq!(dims.display_width, 1224.0);
        assert_eq!(dims.display_height, 1584.0);
        assert_eq!(dims.native_width, 612.0);
        assert_eq!(dims.scale, 2.0);
    }

    #[test]
    fn round_trip_is_identity_within_tolerance() {
        let cases = [
            (100.0, 800.0, 612.0),
            (0.0, 800.0, 612.0),
            (799.9, 800.0, 612.0),
            (37.25, 1234.5, 678.9),
        ];

        for (value, display_extent, native_extent) in cases {
            let native = to_native(value, display_extent, native_extent);
            let back = to_display(native, display_extent, native_extent);
            assert!(
                (back - value).abs() < EPSILON,
                "round trip drifted: {value} -> {native} -> {back}"
            );
        }
    }

    #[test]
    fn letter_page_at_800px_maps_to_expected_native_x() {
        // Page rendered at 800x1100 display for a 612x792 native page.
        let dims = PageDimensions {
            display_width: 800.0,
            display_height: 1100.0,
            native_width: 612.0,
            native_height: 792.0,
            scale: 800.0 / 612.0,
        };

        let native_x = dims.to_native_x(100.0);
        assert!((native_x - 76.5).abs() < EPSILON);

        // After the page re-renders at double the display size, the same
        // native value lands at exactly twice the display position.
        let zoomed = PageDimensions {
            display_width: 1600.0,
            display_height: 2200.0,
            native_width: 612.0,
            native_height: 792.0,
            scale: 1600.0 / 612.0,
        };
        assert!((zoomed.to_display_x(native_x) - 200.0).abs() < EPSILON);
    }

    #[test]
    fn repeated_zoom_cycles_do_not_drift() {
        let native = PageDimensions {
            display_width: 800.0,
            display_height: 1100.0,
            native_width: 612.0,
            native_height: 792.0,
            scale: 800.0 / 612.0,
        }
        .to_native_x(100.0);

        // Re-deriving display from the unchanged native value at many
        // alternating scales must always match the direct computation.
        let mut widths = vec![800.0, 1600.0];
        widths.extend((0..20).map(|i| if i % 2 == 0 { 1600.0 } else { 800.0 }));

        for width in widths {
            let dims = PageDimensions {
                display_width: width,
                display_height: width * 11.0 / 8.0,
                native_width: 612.0,
                native_height: 792.0,
                scale: width / 612.0,
            };
            let expected = native / 612.0 * width;
            assert!((dims.to_display_x(native) - expected).abs() < EPSILON);
        }
    }

    #[test]
    fn store_returns_none_before_first_render() {
        let store = DimensionStore::new();
        assert!(store.get(1).is_none());
        assert!(store.is_empty());

        store.insert(1, PageDimensions::from_native(612.0, 792.0, 1.5));
        assert!(store.contains(1));
        assert_eq!(store.len(), 1);
        assert!(store.get(2).is_none());
    }

    #[test]
    fn store_insert_overwrites_previous_record() {
        let store = DimensionStore::new();
        store.insert(3, PageDimensions::from_native(612.0, 792.0, 1.0));
        store.insert(3, PageDimensions::from_native(612.0, 792.0, 2.0));

        let dims = store.get(3).unwrap();
        assert_eq!(dims.scale, 2.0);
        assert_eq!(dims.display_width, 1224.0);
    }

    #[test]
    fn store_clear_drops_everything() {
        let store = DimensionStore::new();
        store.insert(1, PageDimensions::from_native(612.0, 792.0, 1.0));
        store.insert(2, PageDimensions::from_native(612.0, 792.0, 1.0));

        store.clear();
        assert!(store.is_empty());
        assert!(store.get(1).is_none());
    }
}
