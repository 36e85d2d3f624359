//! Extraction: one document, one model, one timed chat call.
//!
//! [`InvoiceExtractor`] joins a [`Rasterize`] implementation to a
//! [`VisionChat`] implementation. Failures of either are folded into
//! [`ExtractionOutcome::Failed`] so the caller can log the message and move on
//! to the next (document, model) pair.
//!
//! ## Usage
//!
//! ```no_run
//! use invoice_extract::{
//!     Extract, InvoiceDocument, InvoiceExtractor, ModelSpec, OllamaClient, PdfRenderer,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let client = OllamaClient::new("http://localhost:11434", 600)?;
//! let extractor = InvoiceExtractor::new(client, PdfRenderer::default());
//! let document = InvoiceDocument::open("invoice-test-1.pdf")?;
//! let model = ModelSpec::new("qwen2.5vl", 3, 3.2);
//!
//! let result = extractor.extract(&document, &model);
//! println!("{:.2}s: {}", result.elapsed_secs(), result.raw_text());
//! # Ok(())
//! # }
//! ```

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::document::InvoiceDocument;
use crate::error::ParseError;
use crate::model::ModelSpec;
use crate::ollama::VisionChat;
use crate::prompt::INVOICE_PROMPT;
use crate::render::Rasterize;
use crate::response::{InvoiceFields, Response};

/// What came back from a model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// The model answered; the answer may still fail to parse.
    Completed(Response),
    /// Rendering or the chat call failed.
    Failed(String),
}

/// One (document, model) extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Document file name
    pub document: String,
    /// Model that produced the answer
    pub model: ModelSpec,
    /// Answer or failure message
    pub outcome: ExtractionOutcome,
    /// Wall-clock time of the chat call
    pub elapsed: Duration,
}

impl ExtractionResult {
    /// Text written to side files and shown to the judge: the cleaned answer,
    /// or the failure message.
    #[must_use]
    pub fn raw_text(&self) -> &str {
        match &self.outcome {
            ExtractionOutcome::Completed(response) => response.as_str(),
            ExtractionOutcome::Failed(message) => message,
        }
    }

    /// Elapsed time in seconds.
    #[inline]
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// `true` when the model produced an answer.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Completed(_))
    }

    /// Parse the invoice fields out of the answer.
    ///
    /// A failed call is parsed too: its message is not JSON, so it fails the
    /// same way a malformed answer does.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the text is not valid JSON.
    pub fn fields(&self) -> Result<InvoiceFields, ParseError> {
        match &self.outcome {
            ExtractionOutcome::Completed(response) => response.deserialize(),
            ExtractionOutcome::Failed(message) => Response::new(message).deserialize(),
        }
    }
}

/// Anything that can run one extraction.
///
/// Implementations never fail: errors end up in [`ExtractionOutcome::Failed`].
pub trait Extract {
    /// Extract invoice fields from `document` with `model`.
    fn extract(&self, document: &InvoiceDocument, model: &ModelSpec) -> ExtractionResult;
}

/// Renders documents and sends them to a vision model.
///
/// The last rendered page is kept so every model run against the same
/// document reuses one PNG.
pub struct InvoiceExtractor<C, R> {
    chat: C,
    renderer: R,
    last_page: RefCell<Option<(PathBuf, Arc<[u8]>)>>,
}

impl<C: VisionChat, R: Rasterize> InvoiceExtractor<C, R> {
    /// Combine a chat client and a renderer.
    #[must_use]
    pub fn new(chat: C, renderer: R) -> Self {
        Self {
            chat,
            renderer,
            last_page: RefCell::new(None),
        }
    }

    fn page_png(&self, document: &InvoiceDocument) -> anyhow::Result<Arc<[u8]>> {
        if let Some((path, png)) = self.last_page.borrow().as_ref() {
            if path == document.path() {
                debug!(document = document.file_name(), "Reusing rendered page");
                return Ok(Arc::clone(png));
            }
        }
        let png: Arc<[u8]> = self.renderer.rasterize(document)?.into();
        *self.last_page.borrow_mut() = Some((document.path().to_path_buf(), Arc::clone(&png)));
        Ok(png)
    }
}

impl<C: VisionChat, R: Rasterize> Extract for InvoiceExtractor<C, R> {
    fn extract(&self, document: &InvoiceDocument, model: &ModelSpec) -> ExtractionResult {
        let tag = model.tag();
        let mut elapsed = Duration::ZERO;

        let outcome = match self.page_png(document) {
            Err(e) => {
                warn!(document = document.file_name(), error = %e, "Rendering failed");
                ExtractionOutcome::Failed(format!("Error: {e:#}"))
            }
            Ok(png) => {
                let start = Instant::now();
                let answer = self.chat.chat_with_image(&tag, INVOICE_PROMPT, &png);
                elapsed = start.elapsed();
                match answer {
                    Ok(text) => ExtractionOutcome::Completed(Response::new(&text)),
                    Err(e) => {
                        warn!(
                            document = document.file_name(),
                            model = %tag,
                            error = %e,
                            "Model call failed"
                        );
                        ExtractionOutcome::Failed(format!("Error: {e:#}"))
                    }
                }
            }
        };

        debug!(
            document = document.file_name(),
            model = %tag,
            elapsed_secs = elapsed.as_secs_f64(),
            "Extraction finished"
        );

        ExtractionResult {
            document: document.file_name().to_string(),
            model: model.clone(),
            outcome,
            elapsed,
        }
    }
}
