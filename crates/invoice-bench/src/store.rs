//! Append-only CSV record of benchmark scores.
//!
//! Every scored (document, model) pair becomes one row, appended and flushed
//! immediately so a crash loses at most the row being written. Rows are never
//! rewritten. The same file doubles as resume state: a later run skips every
//! (document, model name, parameters) triple already present.
//!
//! ```text
//! model_name,model_parameters,model_size,document_id,elapsed_time_seconds,user_rating_percentage
//! qwen2.5vl,7,6.0,invoice-test-1.pdf,41.2,85.0
//! ```

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use invoice_extract::ModelSpec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Column names, in file order.
pub const HEADER: [&str; 6] = [
    "model_name",
    "model_parameters",
    "model_size",
    "document_id",
    "elapsed_time_seconds",
    "user_rating_percentage",
];

/// One scored extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub model_name: String,
    pub model_parameters: u32,
    pub model_size: f64,
    /// Document file name. Older files call this column `pdf_file`.
    #[serde(alias = "pdf_file")]
    pub document_id: String,
    pub elapsed_time_seconds: f64,
    pub user_rating_percentage: f64,
}

impl ScoreRecord {
    #[must_use]
    pub fn new(model: &ModelSpec, document: &str, elapsed_secs: f64, rating: f64) -> Self {
        Self {
            model_name: model.name.clone(),
            model_parameters: model.parameters,
            model_size: model.size_gb,
            document_id: document.to_string(),
            elapsed_time_seconds: elapsed_secs,
            user_rating_percentage: rating,
        }
    }

    /// Identity of the row for resumption.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey {
            document_id: self.document_id.clone(),
            model_name: self.model_name.clone(),
            model_parameters: self.model_parameters.to_string(),
        }
    }
}

/// Resume identity: (document, model name, model parameters).
///
/// Parameters are kept as the text found in the file so a hand-edited value
/// still matches what was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct RecordKey {
    #[serde(alias = "pdf_file")]
    pub document_id: String,
    pub model_name: String,
    pub model_parameters: String,
}

impl RecordKey {
    #[must_use]
    pub fn new(document: &str, model: &ModelSpec) -> Self {
        Self {
            document_id: document.to_string(),
            model_name: model.name.clone(),
            model_parameters: model.parameters.to_string(),
        }
    }
}

/// Crash-safe score log plus the rows recorded during this session.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    session: Vec<ScoreRecord>,
}

impl RecordStore {
    /// Open `path`, writing the header if the file does not exist yet.
    ///
    /// An existing file is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let mut writer = WriterBuilder::new()
                .has_headers(false)
                .from_path(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writer.write_record(HEADER)?;
            writer.flush()?;
            debug!(path = %path.display(), "Created record store");
        }
        Ok(Self {
            path,
            session: Vec::new(),
        })
    }

    /// Path of the backing file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended during this session, oldest first.
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[ScoreRecord] {
        &self.session
    }

    /// Append one row and flush it to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    pub fn append(&mut self, record: ScoreRecord) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {} for append", self.path.display()))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .serialize(&record)
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        writer.flush()?;
        self.session.push(record);
        Ok(())
    }

    /// Write the header and this session's rows to `path`, replacing any
    /// existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn export(&self, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(HEADER)?;
        for record in &self.session {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Identity triples of every row in `path`.
///
/// A missing file is an empty set, and so is one whose header cannot be read.
/// Rows that are short, torn or unparsable are logged and skipped; every other
/// row still counts.
#[must_use]
pub fn load_processed_keys(path: &Path) -> HashSet<RecordKey> {
    if !path.exists() {
        return HashSet::new();
    }
    match read_keys(path) {
        Ok(keys) => keys,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable progress CSV, resuming from scratch");
            HashSet::new()
        }
    }
}

fn read_keys(path: &Path) -> Result<HashSet<RecordKey>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut keys = HashSet::new();
    for (idx, row) in reader.records().enumerate() {
        let parsed = row.map_err(anyhow::Error::from).and_then(|record| {
            anyhow::ensure!(
                record.len() == headers.len(),
                "expected {} fields, found {}",
                headers.len(),
                record.len()
            );
            Ok(record.deserialize::<RecordKey>(Some(&headers))?)
        });
        match parsed {
            Ok(key) => {
                keys.insert(key);
            }
            Err(e) => warn!(
                path = %path.display(),
                line = idx + 2,
                error = %e,
                "Skipping malformed progress row"
            ),
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(doc: &str, params: u32, rating: f64) -> ScoreRecord {
        ScoreRecord::new(&ModelSpec::new("qwen2.5vl", params, 3.2), doc, 12.5, rating)
    }

    #[test]
    fn test_open_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/metrics_progress.csv");

        let mut store = RecordStore::open(&path).unwrap();
        store.append(record("a.pdf", 3, 80.0)).unwrap();
        drop(store);

        // Reopening must not clobber existing rows
        let mut store = RecordStore::open(&path).unwrap();
        store.append(record("b.pdf", 3, 60.0)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.join(","));
        assert!(lines[1].starts_with("qwen2.5vl,3,3.2,a.pdf,"));
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn test_load_processed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.csv");
        let mut store = RecordStore::open(&path).unwrap();
        store.append(record("a.pdf", 3, 80.0)).unwrap();
        store.append(record("a.pdf", 7, 50.0)).unwrap();

        let keys = load_processed_keys(&path);
        assert_eq!(keys.len(), 2);
        assert!(store.records().iter().all(|r| keys.contains(&r.key())));
        assert!(keys.contains(&RecordKey::new("a.pdf", &ModelSpec::new("qwen2.5vl", 3, 0.0))));
        assert!(!keys.contains(&RecordKey::new("b.pdf", &ModelSpec::new("qwen2.5vl", 3, 0.0))));
    }

    #[test]
    fn test_load_processed_keys_accepts_legacy_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        fs::write(
            &path,
            "model_name,model_parameters,model_size,pdf_file,elapsed_time_seconds,user_rating_percentage\n\
             m,3,1.0,a.pdf,2.0,100.0\n",
        )
        .unwrap();

        let keys = load_processed_keys(&path);
        assert!(keys.contains(&RecordKey {
            document_id: "a.pdf".into(),
            model_name: "m".into(),
            model_parameters: "3".into(),
        }));
    }

    #[test]
    fn test_torn_last_row_keeps_earlier_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.csv");
        fs::write(
            &path,
            format!(
                "{}\nm,3,1.0,a.pdf,2.0,100.0\nm,7,4.5,a.pdf,2.0,90.0\nm,3,1.0,b.p",
                HEADER.join(",")
            ),
        )
        .unwrap();

        let keys = load_processed_keys(&path);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&RecordKey::new("a.pdf", &ModelSpec::new("m", 3, 1.0))));
        assert!(keys.contains(&RecordKey::new("a.pdf", &ModelSpec::new("m", 7, 4.5))));
    }

    #[test]
    fn test_bad_row_in_the_middle_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.csv");
        fs::write(
            &path,
            format!(
                "{}\nm,3,1.0,a.pdf,2.0,100.0\nm,3\nm,3,1.0,c.pdf,2.0,80.0,extra\nm,3,1.0,b.pdf,1.0,50.0\n",
                HEADER.join(",")
            ),
        )
        .unwrap();

        let keys = load_processed_keys(&path);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&RecordKey::new("b.pdf", &ModelSpec::new("m", 3, 1.0))));
        assert!(!keys.contains(&RecordKey::new("c.pdf", &ModelSpec::new("m", 3, 1.0))));
    }

    #[test]
    fn test_missing_or_corrupt_file_is_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_processed_keys(&dir.path().join("absent.csv")).is_empty());

        let path = dir.path().join("corrupt.csv");
        fs::write(&path, "garbage\n\"unterminated,\n").unwrap();
        assert!(load_processed_keys(&path).is_empty());
    }

    #[test]
    fn test_export_writes_session_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RecordStore::open(dir.path().join("progress.csv")).unwrap();
        store.append(record("a.pdf", 3, 80.0)).unwrap();

        let out = dir.path().join("metrics.csv");
        store.export(&out).unwrap();
        let contents = fs::read_to_string(&out).unwrap();
        assert_eq!(contents.lines().count(), 2);

        let empty = RecordStore::open(dir.path().join("other.csv")).unwrap();
        let out = dir.path().join("empty.csv");
        empty.export(&out).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), HEADER.join(","));
    }
}
