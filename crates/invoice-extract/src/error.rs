//! Error types for document ingestion and response parsing.
//!
//! Two families live here because they surface at different times:
//!
//! - [`DocumentError`] is raised while opening an input PDF and aborts the
//!   run before any model is called.
//! - [`ParseError`] is raised when a model's answer is not valid JSON. It only
//!   appears at scoring time, where the result is scored as zero.
//!
//! Failures of the model call itself are not errors at this level; they are
//! captured in [`crate::ExtractionOutcome::Failed`] so a batch keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening an input document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The path does not exist.
    #[error("File {} does not exist", path.display())]
    NotFound {
        /// Requested path
        path: PathBuf,
    },

    /// The PDF has more than one page. Multi-page inputs are rejected rather
    /// than truncated to their first page.
    #[error("PDF {} has {pages} pages; only single-page documents are supported", path.display())]
    MultiPage {
        /// Offending document
        path: PathBuf,
        /// Page count reported by the PDF page tree
        pages: usize,
    },

    /// The PDF declares no pages at all.
    #[error("PDF {} has no pages", path.display())]
    Empty {
        /// Offending document
        path: PathBuf,
    },

    /// The file exists but could not be parsed as a PDF.
    #[error("Failed to read PDF {}: {reason}", path.display())]
    Unreadable {
        /// Offending document
        path: PathBuf,
        /// Parser message
        reason: String,
    },
}

/// A model answer that could not be parsed as the expected JSON object.
#[derive(Error, Debug)]
#[error("Response is not valid JSON ({source}): {preview}")]
pub struct ParseError {
    /// Underlying JSON error
    #[source]
    pub source: serde_json::Error,
    /// First characters of the cleaned payload, for diagnostics
    pub preview: String,
}

/// Maximum number of characters kept in [`ParseError::preview`].
const PREVIEW_CHARS: usize = 80;

impl ParseError {
    pub(crate) fn new(source: serde_json::Error, payload: &str) -> Self {
        let mut preview: String = payload.chars().take(PREVIEW_CHARS).collect();
        if payload.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self { source, preview }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_page_message_is_descriptive() {
        let err = DocumentError::MultiPage {
            path: PathBuf::from("scan.pdf"),
            pages: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("scan.pdf"));
        assert!(msg.contains("2 pages"));
    }

    #[test]
    fn test_parse_error_preview_is_truncated() {
        let payload = "x".repeat(200);
        let source = serde_json::from_str::<serde_json::Value>(&payload).unwrap_err();
        let err = ParseError::new(source, &payload);
        assert_eq!(err.preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(err.preview.ends_with("..."));
    }
}
