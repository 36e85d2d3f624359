//! PDF rasterization to PNG using pdfium.
//!
//! Vision models receive the invoice as a single PNG. [`PdfRenderer`] renders
//! the first (and only) page of an [`InvoiceDocument`] at a configurable DPI.
//!
//! ## Usage
//!
//! ```no_run
//! use invoice_extract::{InvoiceDocument, PdfRenderer, Rasterize};
//!
//! # fn example() -> anyhow::Result<()> {
//! let document = InvoiceDocument::open("invoice-test-1.pdf")?;
//! let renderer = PdfRenderer::new(150);
//! let png = renderer.rasterize(&document)?;
//! println!("{} bytes of PNG", png.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Library discovery
//!
//! The PDFium shared library is bound on every call: `PDFIUM_DYNAMIC_LIB_PATH`
//! first, then the system search path. `Pdfium` is not `Send`, and binding per
//! call keeps the renderer itself `Send` so it can move onto the extraction
//! worker thread. The OS caches the `dlopen`, so repeat binds are cheap next to
//! a model call.

// Clippy pedantic allows:
// - DPI and dimension calculations involve various cast types
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use anyhow::{Context, Result};
use image::ImageFormat;
use pdfium_render::prelude::*;
use tracing::debug;

use crate::document::InvoiceDocument;

/// PDF points per inch - standard PostScript/PDF unit conversion factor.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Default rendering resolution.
pub const DEFAULT_DPI: u32 = 150;

/// Something that turns a document into PNG bytes.
///
/// The extractor depends on this trait rather than on pdfium directly so that
/// the pipeline can be exercised without the native library.
pub trait Rasterize: Send {
    /// Render the document's page to PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded or rendered.
    fn rasterize(&self, document: &InvoiceDocument) -> Result<Vec<u8>>;
}

/// Render a PDF page to PNG at the specified DPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfRenderer {
    dpi: u32,
}

impl Default for PdfRenderer {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_DPI)
    }
}

impl PdfRenderer {
    /// Create a renderer for the given resolution.
    #[must_use]
    pub const fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    /// Rendering resolution in dots per inch.
    #[inline]
    #[must_use]
    pub const fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Target pixel size for a page of the given size in points.
    fn target_size(&self, width_pts: f32, height_pts: f32) -> (i32, i32) {
        let scale = self.dpi as f32 / PDF_POINTS_PER_INCH;
        (
            ((width_pts * scale) as i32).max(1),
            ((height_pts * scale) as i32).max(1),
        )
    }
}

impl Rasterize for PdfRenderer {
    fn rasterize(&self, document: &InvoiceDocument) -> Result<Vec<u8>> {
        let pdfium = bind_pdfium()?;
        let pdf = pdfium
            .load_pdf_from_file(document.path(), None)
            .with_context(|| format!("Failed to load PDF {}", document.path().display()))?;

        let page = pdf.pages().get(0).context("PDF has no first page")?;

        let (width, height) = self.target_size(page.width().value, page.height().value);
        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height);

        let bitmap = page
            .render_with_config(&render_config)
            .context("Failed to render page 1")?;

        let image = bitmap.as_image();
        let mut png_bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
            .context("Failed to encode PNG")?;

        debug!(
            document = document.file_name(),
            width,
            height,
            bytes = png_bytes.len(),
            "Rendered page"
        );
        Ok(png_bytes)
    }
}

/// Bind the PDFium shared library.
fn bind_pdfium() -> Result<Pdfium> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load PDFium from {path}: {e}"))?;
        return Ok(Pdfium::new(bindings));
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        anyhow::anyhow!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        )
    })?;
    Ok(Pdfium::new(bindings))
}
