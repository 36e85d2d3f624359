//! Benchmark configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML file given with
//! `--config`, environment variables, command-line flags.
//!
//! ```toml
//! pdf_dir = "invoices"
//! output_dir = "runs"
//! poll_interval_ms = 500
//!
//! [ollama]
//! host = "http://gpu-box:11434"
//! timeout_secs = 900
//!
//! [render]
//! dpi = 200
//!
//! [[models]]
//! name = "qwen2.5vl"
//! parameters = 7
//! size_gb = 6.0
//!
//! [expected."invoice-test-1.pdf"]
//! total_including_vat = 75.02
//! supplier = "Station Mairie ARVIEU"
//! ```
//!
//! Setting `models` or `expected` in the file replaces the whole default table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use invoice_extract::{ModelSpec, DEFAULT_DPI, DEFAULT_OLLAMA_HOST};
use serde::{Deserialize, Serialize};

use crate::catalog::{default_expected, default_models, ExpectedFields};

/// Default directory scanned for input PDFs.
pub const DEFAULT_PDF_DIR: &str = "tests/test_data/pdf";

/// Default base directory for numbered run folders.
pub const DEFAULT_OUTPUT_DIR: &str = "tests/test_data/json_batches";

/// File name of the crash-safe progress CSV inside the output directory.
pub const PROGRESS_CSV_NAME: &str = "metrics_progress.csv";

/// Default per-request timeout for model calls. Large models on CPU are slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default consumer dequeue timeout.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Ollama connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Rasterization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub dpi: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { dpi: DEFAULT_DPI }
    }
}

/// Everything a benchmark run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Directory scanned for `*.pdf` inputs
    pub pdf_dir: PathBuf,
    /// Base directory for numbered run folders
    pub output_dir: PathBuf,
    /// Progress CSV; `<output_dir>/metrics_progress.csv` when unset
    pub progress_csv: Option<PathBuf>,
    /// How long the rating loop waits on an empty queue before logging
    pub poll_interval_ms: u64,
    pub ollama: OllamaConfig,
    pub render: RenderConfig,
    /// Models to benchmark, in run order
    pub models: Vec<ModelSpec>,
    /// Ground truth keyed by document file name
    pub expected: BTreeMap<String, ExpectedFields>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from(DEFAULT_PDF_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            progress_csv: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            ollama: OllamaConfig::default(),
            render: RenderConfig::default(),
            models: default_models(),
            expected: default_expected(),
        }
    }
}

impl BenchConfig {
    /// Load a TOML file, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file as TOML: {}", path.display()))?;
        Ok(config)
    }

    /// Apply environment overrides from the process environment.
    ///
    /// Environment variables:
    /// - `OLLAMA_HOST`: Ollama base URL
    /// - `INVOICE_BENCH_PDF_DIR`: input directory
    /// - `INVOICE_BENCH_OUTPUT_DIR`: output base directory
    #[must_use = "returns the updated config"]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides from an arbitrary lookup.
    #[must_use = "returns the updated config"]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup("OLLAMA_HOST").filter(|s| !s.is_empty()) {
            self.ollama.host = normalize_host(&host);
        }
        if let Some(dir) = lookup("INVOICE_BENCH_PDF_DIR").filter(|s| !s.is_empty()) {
            self.pdf_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("INVOICE_BENCH_OUTPUT_DIR").filter(|s| !s.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        self
    }

    /// Progress CSV used for crash-safe appends and resumption.
    #[must_use]
    pub fn progress_csv_path(&self) -> PathBuf {
        self.progress_csv
            .clone()
            .unwrap_or_else(|| self.output_dir.join(PROGRESS_CSV_NAME))
    }

    /// Consumer dequeue timeout.
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Expected values for a document; unknown documents expect nothing.
    #[must_use]
    pub fn expected_for(&self, document: &str) -> ExpectedFields {
        self.expected.get(document).cloned().unwrap_or_default()
    }
}

/// `OLLAMA_HOST` is often set as a bare `host:port` for the Ollama server
/// itself; the client needs a URL.
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
