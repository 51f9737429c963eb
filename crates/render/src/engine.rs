//! Render engine boundary
//!
//! The viewer does not parse documents itself. An external engine
//! exposes the capability surface this module declares: page count,
//! page lookup, the page's native viewport at scale 1, and rendering a
//! page into a caller-allocated pixel surface at a requested scale.
//! Engine calls are the render pipeline's suspension points.

use crate::cancel::CancellationToken;
use std::future::Future;

/// Errors surfaced by a render engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The in-flight operation was cancelled. Expected during normal
    /// operation (zoom/page changes) and swallowed by callers.
    #[error("render cancelled")]
    Cancelled,

    /// Requested page does not exist
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// The engine failed to draw the page
    #[error("engine render failed: {0}")]
    Render(String),

    /// The document could not be loaded. Fatal for the viewer session.
    #[error("document load failed: {0}")]
    Load(String),
}

/// Native size of a page, in document units (viewport at scale 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A viewport describing the target raster for one render call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderViewport {
    /// Target width in display pixels
    pub width: f64,

    /// Target height in display pixels
    pub height: f64,

    /// Scale relative to the native page size
    pub scale: f64,
}

impl RenderViewport {
    /// Viewport for a page at the given scale
    pub fn for_page(native: PageSize, scale: f64) -> Self {
        Self {
            width: native.width * scale,
            height: native.height * scale,
            scale,
        }
    }

    /// Surface width in whole pixels
    pub fn pixel_width(&self) -> u32 {
        self.width.ceil() as u32
    }

    /// Surface height in whole pixels
    pub fn pixel_height(&self) -> u32 {
        self.height.ceil() as u32
    }
}

/// Off-screen RGBA8 surface a page renders into
///
/// Allocated per render task and painted opaque white before the engine
/// draws, so transparent regions of the source page do not show
/// through.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelSurface {
    /// Allocate a transparent-black surface
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Paint the whole surface opaque white
    pub fn fill_white(&mut self) {
        self.pixels.fill(0xff);
    }

    /// Raw RGBA pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable pixel access for the engine's draw call
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Freeze the surface into an immutable bitmap
    pub fn into_bitmap(self) -> Bitmap {
        Bitmap {
            width: self.width,
            height: self.height,
            pixels: self.pixels,
        }
    }
}

/// Immutable rendered page bitmap
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Memory footprint of the pixel data in bytes
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }
}

/// One page of an open document
pub trait DocumentPage: Send {
    /// Native viewport of the page at scale 1
    fn native_size(&self) -> PageSize;

    /// Draw the page into `surface` at the viewport's scale
    ///
    /// May suspend. Implementations should honor the token where they
    /// can and return [`EngineError::Cancelled`] when they do; callers
    /// also re-validate after the call, so best-effort is acceptable.
    fn render_into(
        &self,
        surface: &mut PixelSurface,
        viewport: &RenderViewport,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// An open document held by the external page-rendering engine
///
/// Obtained once per viewer session from a binary source; the session
/// owns it for its lifetime. Page numbers are 1-based.
pub trait RenderEngine: Send + Sync + 'static {
    type Page: DocumentPage;

    /// Number of pages in the document
    fn page_count(&self) -> u32;

    /// Fetch a page reference. May suspend.
    fn page(&self, page_number: u32) -> impl Future<Output = Result<Self::Page, EngineError>> + Send;
}
