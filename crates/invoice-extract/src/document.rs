//! Input documents.
//!
//! An [`InvoiceDocument`] is a validated reference to a single-page PDF on
//! disk. Validation happens once, at construction: the file must exist and its
//! page tree must contain exactly one page. Page counting goes through `lopdf`,
//! so it works without the PDFium shared library that rendering needs.

use crate::error::DocumentError;
use std::path::{Path, PathBuf};

/// A single-page PDF ready to be sent to a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvoiceDocument {
    path: PathBuf,
    file_name: String,
}

impl InvoiceDocument {
    /// Open and validate a document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] for a missing path,
    /// [`DocumentError::Unreadable`] when the file is not a PDF,
    /// [`DocumentError::Empty`] for a PDF with no pages and
    /// [`DocumentError::MultiPage`] for anything longer than one page.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocumentError::NotFound {
                path: path.to_path_buf(),
            });
        }

        match page_count(path)? {
            0 => Err(DocumentError::Empty {
                path: path.to_path_buf(),
            }),
            1 => Ok(Self {
                path: path.to_path_buf(),
                file_name: path.file_name().map_or_else(
                    || path.display().to_string(),
                    |n| n.to_string_lossy().to_string(),
                ),
            }),
            pages => Err(DocumentError::MultiPage {
                path: path.to_path_buf(),
                pages,
            }),
        }
    }

    /// Path on disk.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension, e.g. `invoice-test-1.pdf`.
    ///
    /// This is the document's identity in the record store.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// File name without its extension, used to name side files.
    #[must_use]
    pub fn stem(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map_or(self.file_name.as_str(), |(stem, _)| stem)
    }
}

/// Number of pages in a PDF according to its page tree.
///
/// # Errors
///
/// Returns [`DocumentError::Unreadable`] if the file cannot be parsed.
pub fn page_count(path: &Path) -> Result<usize, DocumentError> {
    let document = lopdf::Document::load(path).map_err(|e| DocumentError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(document.get_pages().len())
}
