//! Input document discovery and resume slicing.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use invoice_extract::{DocumentError, InvoiceDocument};
use tracing::{info, warn};

/// Where a run should start in the sorted document list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StartPoint {
    /// From the first document
    #[default]
    Beginning,
    /// From the document with this file name, inclusive
    File(String),
    /// From this 1-based position, inclusive
    Index(usize),
}

/// File names of the PDFs in `dir`, sorted case-sensitively.
///
/// The extension check is case-insensitive, so `SCAN.PDF` is included.
///
/// # Errors
///
/// Returns an error if `dir` cannot be read.
pub fn list_documents(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("PDF dir not found: {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.to_lowercase().ends_with(".pdf") {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

/// Drop the documents before `start`.
///
/// An unknown file name or an out-of-range index keeps the whole list and
/// logs a warning.
#[must_use]
pub fn resume_from(files: Vec<String>, start: &StartPoint) -> Vec<String> {
    match start {
        StartPoint::Beginning => files,
        StartPoint::File(name) => match files.iter().position(|f| f == name) {
            Some(idx) => {
                info!(file = %name, index = idx + 1, "Starting from requested file");
                files.into_iter().skip(idx).collect()
            }
            None => {
                warn!(file = %name, "Start file not found. Starting from beginning");
                files
            }
        },
        StartPoint::Index(index) => {
            if *index < 1 {
                warn!(index, "Start index must be >= 1. Starting from beginning");
                files
            } else if *index > files.len() {
                warn!(
                    index,
                    count = files.len(),
                    "Start index exceeds file count. Starting from beginning"
                );
                files
            } else {
                let files: Vec<String> = files.into_iter().skip(index - 1).collect();
                info!(index, file = %files[0], "Starting from index");
                files
            }
        }
    }
}

/// Open and validate every listed document.
///
/// Stops at the first invalid document so a multi-page or missing input ends
/// the run before any model is called.
///
/// # Errors
///
/// Returns the first [`DocumentError`] encountered.
pub fn open_documents(dir: &Path, files: &[String]) -> Result<Vec<InvoiceDocument>, DocumentError> {
    files
        .iter()
        .map(|name| InvoiceDocument::open(dir.join(name)))
        .collect()
}
