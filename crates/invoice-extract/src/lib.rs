//! # invoice-extract
//!
//! Extract invoice totals, date and supplier from single-page PDFs with a
//! vision model served by Ollama.
//!
//! The pipeline for one (document, model) pair:
//!
//! 1. [`InvoiceDocument::open`] validates the PDF (exists, exactly one page).
//! 2. [`PdfRenderer`] rasterizes the page to PNG with PDFium.
//! 3. [`OllamaClient`] sends the PNG and [`INVOICE_PROMPT`] to the model.
//! 4. [`Response`] strips code fences; [`Response::deserialize`] yields
//!    [`InvoiceFields`].
//!
//! [`InvoiceExtractor`] wires steps 2 and 3 together, times the model call and
//! turns any failure into [`ExtractionOutcome::Failed`] instead of an error.
//!
//! ## Usage
//!
//! ```no_run
//! use invoice_extract::{
//!     Extract, InvoiceDocument, InvoiceExtractor, ModelSpec, OllamaClient, PdfRenderer,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let extractor = InvoiceExtractor::new(
//!     OllamaClient::new("http://localhost:11434", 600)?,
//!     PdfRenderer::new(150),
//! );
//! let document = InvoiceDocument::open("tests/test_data/pdf/invoice-test-1.pdf")?;
//! let result = extractor.extract(&document, &ModelSpec::new("qwen2.5vl", 7, 6.0));
//!
//! match result.fields() {
//!     Ok(fields) => println!("{fields:?}"),
//!     Err(e) => eprintln!("unparseable answer: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod extractor;
pub mod model;
pub mod ollama;
pub mod prompt;
pub mod render;
pub mod response;

pub use document::{page_count, InvoiceDocument};
pub use error::{DocumentError, ParseError};
pub use extractor::{Extract, ExtractionOutcome, ExtractionResult, InvoiceExtractor};
pub use model::ModelSpec;
pub use ollama::{OllamaClient, VisionChat, DEFAULT_OLLAMA_HOST};
pub use prompt::INVOICE_PROMPT;
pub use render::{PdfRenderer, Rasterize, DEFAULT_DPI};
pub use response::{FieldValue, InvoiceFields, Response};
