//! Placement export
//!
//! Flattens the overlay list into serializable records a downstream
//! signing step can consume. Each record carries the display-space box
//! together with the page's display and native sizes, so the consumer
//! can map the box into document space at any resolution.

use serde::Serialize;
use sign_viewer_geometry::DimensionStore;
use sign_viewer_overlay::OverlayList;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// One overlay, resolved against its page's dimensions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRecord {
    pub page_number: u32,

    /// Display-space box at the dimensions below
    pub position: Position,
    pub size: Size,

    /// Display size of the page the box is relative to
    pub page_width: f64,
    pub page_height: f64,

    /// Native page size, for mapping into document space
    pub native_width: f64,
    pub native_height: f64,

    pub image_ref: String,
}

/// Build placement records for every overlay, in placement order
///
/// Overlays on pages without published dimensions are skipped with a
/// warning; they were placed against a render that no longer exists.
pub fn placements(overlays: &OverlayList, dimensions: &DimensionStore) -> Vec<PlacementRecord> {
    overlays
        .snapshot()
        .into_iter()
        .filter_map(|overlay| {
            let Some(dims) = dimensions.get(overlay.page_number) else {
                log::warn!(
                    "overlay {} skipped: page {} has no dimensions",
                    overlay.id,
                    overlay.page_number
                );
                return None;
            };

            Some(PlacementRecord {
                page_number: overlay.page_number,
                position: Position {
                    x: dims.to_display_x(overlay.normalized_x),
                    y: dims.to_display_y(overlay.normalized_y),
                },
                size: Size {
                    width: dims.to_display_x(overlay.normalized_width),
                    height: dims.to_display_y(overlay.normalized_height),
                },
                page_width: dims.display_width,
                page_height: dims.display_height,
                native_width: dims.native_width,
                native_height: dims.native_height,
                image_ref: overlay.image_ref.0.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sign_viewer_geometry::PageDimensions;
    use sign_viewer_overlay::{place_overlay, ImageRef, Point};

    fn letter_at(scale: f64) -> PageDimensions {
        PageDimensions::from_native(612.0, 792.0, scale)
    }

    #[test]
    fn records_follow_placement_order() {
        let list = OverlayList::new();
        let store = DimensionStore::new();
        store.insert(1, letter_at(1.0));
        store.insert(2, letter_at(1.0));

        for (page, x) in [(2, 10.0), (1, 20.0), (2, 30.0)] {
            list.place(place_overlay(
                page,
                Point::new(x, 0.0),
                150.0,
                80.0,
                ImageRef("sig.png".into()),
                &store.get(page).unwrap(),
            ));
        }

        let records = placements(&list, &store);
        let order: Vec<(u32, f64)> = records
            .iter()
            .map(|r| (r.page_number, r.position.x))
            .collect();
        assert_eq!(order, vec![(2, 10.0), (1, 20.0), (2, 30.0)]);
    }

    #[test]
    fn records_use_the_current_page_dimensions() {
        let list = OverlayList::new();
        let store = DimensionStore::new();
        store.insert(1, letter_at(1.0));

        list.place(place_overlay(
            1,
            Point::new(100.0, 50.0),
            150.0,
            80.0,
            ImageRef("sig.png".into()),
            &store.get(1).unwrap(),
        ));

        // The page re-rendered at double scale after placement; the
        // record reflects the newer dimensions.
        store.insert(1, letter_at(2.0));

        let records = placements(&list, &store);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!((record.position.x - 200.0).abs() < 1e-9);
        assert!((record.size.width - 300.0).abs() < 1e-9);
        assert_eq!(record.page_width, 1224.0);
        assert_eq!(record.native_width, 612.0);
    }

    #[test]
    fn overlays_without_page_dimensions_are_skipped() {
        let list = OverlayList::new();
        let store = DimensionStore::new();
        store.insert(1, letter_at(1.0));

        list.place(place_overlay(
            1,
            Point::new(10.0, 10.0),
            150.0,
            80.0,
            ImageRef("a.png".into()),
            &store.get(1).unwrap(),
        ));
        let dims = store.get(1).unwrap();
        list.place(place_overlay(
            2,
            Point::new(20.0, 20.0),
            150.0,
            80.0,
            ImageRef("b.png".into()),
            &dims,
        ));

        // Page 2 never rendered.
        let records = placements(&list, &store);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].image_ref, "a.png");
    }

    #[test]
    fn serialization_is_camel_case() {
        let list = OverlayList::new();
        let store = DimensionStore::new();
        store.insert(1, letter_at(1.0));
        list.place(place_overlay(
            1,
            Point::new(10.0, 10.0),
            150.0,
            80.0,
            ImageRef("sig.png".into()),
            &store.get(1).unwrap(),
        ));

        let json = serde_json::to_string(&placements(&list, &store)).unwrap();
        assert!(json.contains("\"pageNumber\":1"));
        assert!(json.contains("\"imageRef\":\"sig.png\""));
        assert!(json.contains("\"nativeWidth\":612.0"));
    }
}
