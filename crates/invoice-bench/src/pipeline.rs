//! Concurrent extraction and rating.
//!
//! A worker thread runs every (document, model) extraction in order and hands
//! each result to the rating loop on the calling thread, so a human can score
//! one answer while the next model is already running.
//!
//! # Architecture
//!
//! ```text
//! [Extraction Thread]  --QueueItem-->  [Rating Loop]
//!   documents x models                   judge + RecordStore
//! ```
//!
//! - The channel is unbounded: extraction never waits on a slow judge.
//! - Items arrive in document-major, model-minor order, exactly as extracted.
//! - [`QueueItem::Done`] is the only end-of-work signal. A receive timeout just
//!   means the worker is still busy.
//! - The resume set is read before the worker starts and never refreshed, so
//!   rows written by this run's rating loop do not affect this run's worker.
//! - The worker is not joined. It has finished sending by the time `Done` is
//!   received, whatever its thread is still doing.

use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use invoice_extract::{Extract, ExtractionOutcome, ExtractionResult, InvoiceDocument, ModelSpec};
use tracing::{debug, info, warn};

use crate::catalog::ExpectedFields;
use crate::judge::Judge;
use crate::scoring::rate_response;
use crate::store::{RecordKey, RecordStore, ScoreRecord};
use crate::util::{tagged_side_file_name, write_side_file};

/// Message from the extraction worker to the rating loop.
#[derive(Debug)]
pub enum QueueItem {
    /// An extraction waiting to be rated
    Extracted(ExtractionResult),
    /// The worker has nothing more to send
    Done,
}

/// Extraction side of the pipeline.
pub struct Producer<E> {
    extractor: E,
    documents: Vec<InvoiceDocument>,
    models: Vec<ModelSpec>,
    processed: HashSet<RecordKey>,
    side_dir: PathBuf,
}

impl<E: Extract> Producer<E> {
    /// `processed` holds the triples to skip; `side_dir` receives one raw
    /// answer file per extraction.
    pub fn new(
        extractor: E,
        documents: Vec<InvoiceDocument>,
        models: Vec<ModelSpec>,
        processed: HashSet<RecordKey>,
        side_dir: PathBuf,
    ) -> Self {
        Self {
            extractor,
            documents,
            models,
            processed,
            side_dir,
        }
    }

    /// Extract every pending pair, then send [`QueueItem::Done`].
    ///
    /// Returns early, without `Done`, only if the receiver is gone.
    pub fn run(self, tx: &Sender<QueueItem>) {
        for document in &self.documents {
            for model in &self.models {
                let key = RecordKey::new(document.file_name(), model);
                if self.processed.contains(&key) {
                    info!(
                        document = document.file_name(),
                        model = %model.tag(),
                        "Skipping already processed"
                    );
                    continue;
                }

                let result = self.extract(document, model);
                let name = tagged_side_file_name(document.stem(), model, result.elapsed_secs());
                match write_side_file(&self.side_dir, &name, result.raw_text()) {
                    Ok(path) => debug!(path = %path.display(), "Wrote raw answer"),
                    Err(e) => warn!(error = %e, "Could not write raw answer"),
                }

                if tx.send(QueueItem::Extracted(result)).is_err() {
                    warn!("Rating loop is gone, stopping extraction");
                    return;
                }
            }
        }
        // A closed receiver here needs no handling
        let _ = tx.send(QueueItem::Done);
    }

    /// A panicking extractor yields a failed result instead of killing the
    /// worker.
    fn extract(&self, document: &InvoiceDocument, model: &ModelSpec) -> ExtractionResult {
        panic::catch_unwind(AssertUnwindSafe(|| self.extractor.extract(document, model)))
            .unwrap_or_else(|payload| {
                let reason = panic_message(payload.as_ref());
                warn!(
                    document = document.file_name(),
                    model = %model.tag(),
                    reason,
                    "Extraction panicked"
                );
                ExtractionResult {
                    document: document.file_name().to_string(),
                    model: model.clone(),
                    outcome: ExtractionOutcome::Failed(format!("Error: extraction panicked: {reason}")),
                    elapsed: Duration::ZERO,
                }
            })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl<E: Extract + Send + 'static> Producer<E> {
    /// Run on a named background thread. The handle is not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self, tx: Sender<QueueItem>) -> Result<()> {
        thread::Builder::new()
            .name("extraction-worker".to_string())
            .spawn(move || self.run(&tx))
            .context("Failed to spawn extraction worker")?;
        Ok(())
    }
}

/// Rating side of the pipeline.
pub struct Consumer<'a> {
    judge: &'a mut dyn Judge,
    store: &'a mut RecordStore,
    expected: &'a BTreeMap<String, ExpectedFields>,
    poll_interval: Duration,
}

impl<'a> Consumer<'a> {
    pub fn new(
        judge: &'a mut dyn Judge,
        store: &'a mut RecordStore,
        expected: &'a BTreeMap<String, ExpectedFields>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            judge,
            store,
            expected,
            poll_interval,
        }
    }

    /// Rate items until [`QueueItem::Done`]. Returns how many were rated.
    ///
    /// # Errors
    ///
    /// Returns an error if the judge cannot answer, a row cannot be appended,
    /// or the worker disappears without sending `Done`.
    pub fn run(&mut self, rx: &Receiver<QueueItem>) -> Result<usize> {
        let mut rated = 0;
        loop {
            match rx.recv_timeout(self.poll_interval) {
                Ok(QueueItem::Extracted(result)) => {
                    self.rate(&result)?;
                    rated += 1;
                }
                Ok(QueueItem::Done) => {
                    self.judge.note(
                        "Worker completed and sent completion signal. Ending rating loop.",
                    );
                    return Ok(rated);
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.judge
                        .note("No responses to rate at the moment. Waiting...");
                }
                Err(RecvTimeoutError::Disconnected) => {
                    anyhow::bail!("Extraction worker stopped without signalling completion");
                }
            }
        }
    }

    fn rate(&mut self, result: &ExtractionResult) -> Result<()> {
        self.judge.note(&format!(
            "\nTo rate: {} | Model: {} ({}B)",
            result.document, result.model.name, result.model.parameters
        ));

        let expected = self
            .expected
            .get(&result.document)
            .cloned()
            .unwrap_or_default();
        let rating = rate_response(result, &expected, &mut *self.judge)?;

        self.store.append(ScoreRecord::new(
            &result.model,
            &result.document,
            result.elapsed_secs(),
            rating,
        ))?;

        info!(
            document = %result.document,
            model = %result.model.tag(),
            elapsed_secs = result.elapsed_secs(),
            rating,
            "Rated"
        );
        self.judge.note(&format!(
            "Rated {} for model {}: {rating}/100\n",
            result.document, result.model.name
        ));
        Ok(())
    }
}

/// Start `producer` on its own thread and rate on this one until it is done.
///
/// # Errors
///
/// See [`Consumer::run`].
pub fn run_pipeline<E: Extract + Send + 'static>(
    producer: Producer<E>,
    consumer: &mut Consumer<'_>,
) -> Result<usize> {
    let (tx, rx) = unbounded();
    producer.spawn(tx)?;
    consumer.run(&rx)
}
