//! The three benchmark modes.
//!
//! - [`run_batch`]: one model over every document, timing only.
//! - [`run_with_rating`]: every model over every confirmed document, rated
//!   inline, one call at a time.
//! - [`run_threaded`]: every model over every document, extraction on a worker
//!   thread while rating happens here; resumable.
//!
//! All inputs are validated before the first model call, so a missing or
//! multi-page document ends the run immediately.

// Clippy pedantic allows:
// - Progress percentages and averages divide by document counts
#![allow(clippy::cast_precision_loss)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use invoice_extract::{Extract, InvoiceDocument, InvoiceExtractor, ModelSpec, OllamaClient, PdfRenderer};
use tracing::info;

use crate::config::BenchConfig;
use crate::judge::Judge;
use crate::pipeline::{run_pipeline, Consumer, Producer};
use crate::scoring::rate_response;
use crate::source::{list_documents, open_documents, resume_from, StartPoint};
use crate::store::{load_processed_keys, RecordStore, ScoreRecord};
use crate::util::{format_elapsed, next_batch_folder, timed_side_file_name, write_side_file};

/// File name of the per-run metrics snapshot.
pub const METRICS_FILE_NAME: &str = "metrics.csv";

/// Outcome of [`run_batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    /// Folder holding the side files
    pub run_dir: PathBuf,
    /// Documents processed
    pub processed: usize,
    /// Sum of model call times in seconds
    pub total_secs: f64,
}

/// Outcome of a rated run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingSummary {
    /// Folder holding the metrics snapshot
    pub run_dir: PathBuf,
    /// Extractions rated in this session
    pub rated: usize,
    /// Path of the metrics snapshot
    pub metrics_csv: PathBuf,
}

/// Build the production extractor from configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn ollama_extractor(config: &BenchConfig) -> Result<InvoiceExtractor<OllamaClient, PdfRenderer>> {
    let client = OllamaClient::new(&config.ollama.host, config.ollama.timeout_secs)?;
    Ok(InvoiceExtractor::new(client, PdfRenderer::new(config.render.dpi)))
}

fn load_documents(pdf_dir: &Path, start: &StartPoint) -> Result<Vec<InvoiceDocument>> {
    let files = resume_from(list_documents(pdf_dir)?, start);
    Ok(open_documents(pdf_dir, &files)?)
}

/// Run `model` over every document and write one timed side file each.
///
/// Progress goes to `out`.
///
/// # Errors
///
/// Returns an error if the input directory is missing or empty, a document is
/// invalid, or output cannot be written.
pub fn run_batch<E: Extract>(
    config: &BenchConfig,
    model: &ModelSpec,
    extractor: &E,
    out: &mut dyn Write,
) -> Result<BatchSummary> {
    let documents = load_documents(&config.pdf_dir, &StartPoint::Beginning)?;
    let total = documents.len();
    anyhow::ensure!(total > 0, "No PDF files found in {}", config.pdf_dir.display());

    let run_dir = next_batch_folder(&config.output_dir)?;
    info!(model = %model.tag(), documents = total, run_dir = %run_dir.display(), "Starting batch");

    let mut cumulative = 0.0;
    for (idx, document) in documents.iter().enumerate() {
        let idx = idx + 1;
        writeln!(out, "Processing [{idx}/{total}] {}...", document.file_name())?;

        let result = extractor.extract(document, model);
        let elapsed = result.elapsed_secs();
        cumulative += elapsed;
        let remaining = cumulative / idx as f64 * (total - idx) as f64;

        let name = timed_side_file_name(document.stem(), &model.name, elapsed);
        let path = write_side_file(&run_dir, &name, result.raw_text())?;

        let percent = idx as f64 / total as f64 * 100.0;
        writeln!(
            out,
            "Done [{idx}/{total}] {} - took {}, ETA {} - {percent:.1}%",
            document.file_name(),
            format_elapsed(elapsed, ':'),
            format_elapsed(remaining, ':'),
        )?;
        writeln!(out, "Wrote {}\n", path.display())?;
    }

    writeln!(
        out,
        "Processed {total} files in {} (average {}). Output: {}",
        format_elapsed(cumulative, ':'),
        format_elapsed(cumulative / total as f64, ':'),
        run_dir.display()
    )?;

    Ok(BatchSummary {
        run_dir,
        processed: total,
        total_secs: cumulative,
    })
}

/// Run every configured model over each document the judge agrees to, rating
/// each answer before the next model starts.
///
/// # Errors
///
/// Returns an error if inputs are invalid, the judge cannot answer, or a
/// record cannot be written.
pub fn run_with_rating<E: Extract>(
    config: &BenchConfig,
    extractor: &E,
    judge: &mut dyn Judge,
) -> Result<RatingSummary> {
    let documents = load_documents(&config.pdf_dir, &StartPoint::Beginning)?;
    let run_dir = next_batch_folder(&config.output_dir)?;
    let mut store = RecordStore::open(config.progress_csv_path())?;
    let total = documents.len();

    for (idx, document) in documents.iter().enumerate() {
        let file = document.file_name();
        judge.note(&format!("{}/{total} {file}", idx + 1));
        if !judge.confirm("Do you want to proceed?")? {
            continue;
        }

        let expected = config.expected_for(file);
        for model in &config.models {
            judge.note(&format!("Evaluating model: {model}"));

            let result = extractor.extract(document, model);
            let elapsed = result.elapsed_secs();
            let name = timed_side_file_name(document.stem(), &model.name, elapsed);
            let path = write_side_file(&run_dir, &name, result.raw_text())?;

            judge.note(file);
            let rating = rate_response(&result, &expected, judge)?;
            store.append(ScoreRecord::new(model, file, elapsed, rating))?;

            judge.note(&format!(
                "Model {} processed in {}. Output written to {}\n",
                model.name,
                format_elapsed(elapsed, ':'),
                path.display()
            ));
        }
    }

    let metrics_csv = run_dir.join(METRICS_FILE_NAME);
    store.export(&metrics_csv)?;
    judge.note(&format!("Metrics written to {}", metrics_csv.display()));

    Ok(RatingSummary {
        run_dir,
        rated: store.records().len(),
        metrics_csv,
    })
}

/// Extract on a worker thread and rate here, skipping pairs already in the
/// progress CSV.
///
/// # Errors
///
/// Returns an error if inputs are invalid, the judge cannot answer, a record
/// cannot be written, or the worker dies.
pub fn run_threaded<E: Extract + Send + 'static>(
    config: &BenchConfig,
    start: &StartPoint,
    extractor: E,
    judge: &mut dyn Judge,
) -> Result<RatingSummary> {
    let documents = load_documents(&config.pdf_dir, start)?;
    let mut store = RecordStore::open(config.progress_csv_path())?;

    let processed = load_processed_keys(store.path());
    if !processed.is_empty() {
        info!(
            entries = processed.len(),
            path = %store.path().display(),
            "Loaded already-processed entries"
        );
    }

    let side_dir = next_batch_folder(&config.output_dir)?;
    let producer = Producer::new(
        extractor,
        documents,
        config.models.clone(),
        processed,
        side_dir,
    );

    let rated = {
        let mut consumer = Consumer::new(
            judge,
            &mut store,
            &config.expected,
            config.poll_interval(),
        );
        run_pipeline(producer, &mut consumer)?
    };

    let run_dir = next_batch_folder(&config.output_dir)?;
    let metrics_csv = run_dir.join(METRICS_FILE_NAME);
    store
        .export(&metrics_csv)
        .with_context(|| format!("Failed to export metrics to {}", metrics_csv.display()))?;
    judge.note(&format!("Metrics written to {}", metrics_csv.display()));

    Ok(RatingSummary {
        run_dir,
        rated,
        metrics_csv,
    })
}
