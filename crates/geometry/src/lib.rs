//! Pure geometry and timing primitives for the signature viewer
//!
//! This crate holds the scale-independent building blocks that the
//! rendering and overlay crates share:
//! - Per-page dimension records and display/native coordinate transforms
//! - A trailing debouncer with an explicit clock
//! - Viewport visibility tracking with a look-ahead margin
//! - Prefetch window calculation for thumbnail generation
//!
//! Everything here is deterministic and free of I/O so it can be tested
//! without a render engine or an async runtime.

mod debounce;
mod dimensions;
mod prefetch;
mod viewport;

pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use dimensions::{to_display, to_native, DimensionStore, PageDimensions};
pub use prefetch::prefetch_window;
pub use viewport::{ViewportTracker, DEFAULT_LOOKAHEAD_MARGIN};
