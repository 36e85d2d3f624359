//! Run folders, elapsed-time formatting and side-file names.

// Clippy pedantic allows:
// - Elapsed seconds are truncated to whole seconds on purpose
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use invoice_extract::ModelSpec;

/// Create and return the next numbered folder inside `base`.
///
/// Only direct subdirectories whose names are all ASCII digits count; the new
/// folder is one past the largest of them, or `1` when there are none.
///
/// # Errors
///
/// Returns an error if `base` cannot be created or listed, or the new folder
/// cannot be created.
pub fn next_batch_folder(base: &Path) -> Result<PathBuf> {
    fs::create_dir_all(base)
        .with_context(|| format!("Failed to create output directory {}", base.display()))?;

    let mut highest: Option<u64> = None;
    for entry in fs::read_dir(base)
        .with_context(|| format!("Failed to list output directory {}", base.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(n) = name.parse::<u64>() {
            highest = Some(highest.map_or(n, |h| h.max(n)));
        }
    }

    let next = highest.map_or(1, |h| h + 1);
    let folder = base.join(next.to_string());
    fs::create_dir_all(&folder)
        .with_context(|| format!("Failed to create run folder {}", folder.display()))?;
    Ok(folder)
}

/// Format seconds as `MM<sep>SS`, truncating fractions.
///
/// Minutes are not wrapped at 60, so 3725s is `62:05`.
#[must_use]
pub fn format_elapsed(seconds: f64, sep: char) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}{sep}{:02}", total / 60, total % 60)
}

/// Side-file name used by batch and rate modes:
/// `<stem>__<model>__<MM-SS>.json`.
#[must_use]
pub fn timed_side_file_name(stem: &str, model_name: &str, elapsed_secs: f64) -> String {
    format!(
        "{stem}__{model_name}__{}.json",
        format_elapsed(elapsed_secs, '-')
    )
}

/// Side-file name used by threaded mode:
/// `<stem>__<model>__<P>b__<S>s.json`.
#[must_use]
pub fn tagged_side_file_name(stem: &str, model: &ModelSpec, elapsed_secs: f64) -> String {
    format!(
        "{stem}__{}__{}b__{}s.json",
        model.name,
        model.parameters,
        elapsed_secs.max(0.0) as u64
    )
}

/// Write a side file into `dir` and return its path.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_side_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
