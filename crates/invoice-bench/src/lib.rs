//! # invoice-bench
//!
//! Benchmark harness for vision-model invoice extraction.
//!
//! Drives a directory of single-page PDF invoices through a catalog of Ollama
//! vision models, stores each raw answer, and has a human (or any other
//! [`Judge`]) rate the extracted fields. Scores go to an append-only CSV that
//! doubles as resume state.
//!
//! ## Modules
//!
//! - [`config`]: [`BenchConfig`] from defaults, TOML and environment
//! - [`catalog`]: default models and expected invoice values
//! - [`source`]: input listing, validation and resume slicing
//! - [`scoring`]: equality tiers and weighted field scores
//! - [`judge`]: the [`Judge`] seam and the console implementation
//! - [`store`]: the crash-safe [`RecordStore`]
//! - [`pipeline`]: worker thread, queue and rating loop
//! - [`benchmark`]: the batch, rate and threaded modes
//!
//! ## Usage
//!
//! ```no_run
//! use invoice_bench::{benchmark, BenchConfig, ConsoleJudge, StartPoint};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = BenchConfig::default().with_env();
//! let extractor = benchmark::ollama_extractor(&config)?;
//! let mut judge = ConsoleJudge::stdio();
//!
//! let summary = benchmark::run_threaded(
//!     &config,
//!     &StartPoint::File("invoice-test-5.pdf".into()),
//!     extractor,
//!     &mut judge,
//! )?;
//! println!("rated {} extractions", summary.rated);
//! # Ok(())
//! # }
//! ```

pub mod benchmark;
pub mod catalog;
pub mod config;
pub mod judge;
pub mod pipeline;
pub mod scoring;
pub mod source;
pub mod store;
pub mod util;

pub use catalog::ExpectedFields;
pub use config::BenchConfig;
pub use judge::{is_interrupted, ConsoleJudge, Judge, JudgeError};
pub use pipeline::{Consumer, Producer, QueueItem};
pub use scoring::{rate_response, values_equal, Field};
pub use source::StartPoint;
pub use store::{load_processed_keys, RecordKey, RecordStore, ScoreRecord};
