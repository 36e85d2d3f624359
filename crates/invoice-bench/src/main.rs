//! invoice-bench CLI
//!
//! Benchmark Ollama vision models on invoice extraction.
//!
//! ```text
//! invoice-bench batch --model qwen2.5vl:7b
//! invoice-bench rate
//! invoice-bench threaded --start-file invoice-test-5.pdf
//! invoice-bench threaded --start-index 5
//! ```
//!
//! Exit codes: 0 on success, 1 on error, 130 when interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use invoice_bench::{benchmark, is_interrupted, BenchConfig, ConsoleJudge, StartPoint};
use invoice_extract::ModelSpec;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status for a run stopped by the user.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "invoice-bench")]
#[command(about = "Benchmark vision models on invoice extraction with human scoring")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing the PDF invoices
    #[arg(long, global = true)]
    pdf_dir: Option<PathBuf>,

    /// Base directory for numbered run folders
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Progress CSV used for appends and resumption
    #[arg(long, global = true)]
    progress_csv: Option<PathBuf>,

    /// Ollama base URL
    #[arg(long, global = true)]
    ollama_host: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run one model over every PDF and record timings
    Batch {
        /// Model family or tag (e.g. "qwen2.5vl" or "qwen2.5vl:7b")
        #[arg(short, long, default_value = "qwen2.5vl")]
        model: String,
    },

    /// Run every model over each confirmed PDF and rate the answers
    Rate,

    /// Extract in the background while rating; skips pairs already rated
    Threaded {
        /// File name to start from (e.g. "invoice-test-5.pdf")
        #[arg(long, conflicts_with = "start_index")]
        start_file: Option<String>,

        /// 1-based position to start from
        #[arg(long)]
        start_index: Option<usize>,
    },
}

impl Cli {
    fn bench_config(&self) -> Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        }
        .with_env();

        if let Some(dir) = &self.pdf_dir {
            config.pdf_dir.clone_from(dir);
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(path) = &self.progress_csv {
            config.progress_csv = Some(path.clone());
        }
        if let Some(host) = &self.ollama_host {
            config.ollama.host.clone_from(host);
        }
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "invoice_bench=debug,invoice_extract=debug"
    } else {
        "invoice_bench=info,invoice_extract=info"
    };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.bench_config()?;

    match &cli.command {
        Command::Batch { model } => {
            let model = ModelSpec::resolve(model, &config.models).map_err(anyhow::Error::msg)?;
            let extractor = benchmark::ollama_extractor(&config)?;
            let summary =
                benchmark::run_batch(&config, &model, &extractor, &mut std::io::stdout())?;
            info!(
                files = summary.processed,
                total_secs = summary.total_secs,
                run_dir = %summary.run_dir.display(),
                "Batch complete"
            );
        }
        Command::Rate => {
            let extractor = benchmark::ollama_extractor(&config)?;
            let mut judge = ConsoleJudge::stdio();
            let summary = benchmark::run_with_rating(&config, &extractor, &mut judge)?;
            info!(rated = summary.rated, metrics = %summary.metrics_csv.display(), "Rating complete");
        }
        Command::Threaded {
            start_file,
            start_index,
        } => {
            let start = match (start_file, start_index) {
                (Some(file), _) => StartPoint::File(file.clone()),
                (None, Some(index)) => StartPoint::Index(*index),
                (None, None) => StartPoint::Beginning,
            };
            let extractor = benchmark::ollama_extractor(&config)?;
            let mut judge = ConsoleJudge::stdio();
            let summary = benchmark::run_threaded(&config, &start, extractor, &mut judge)?;
            info!(rated = summary.rated, metrics = %summary.metrics_csv.display(), "Threaded run complete");
        }
    }
    Ok(())
}

/// Exit with [`EXIT_INTERRUPTED`] on Ctrl-C. Rows already appended stay on
/// disk.
fn watch_ctrl_c() {
    let spawned = std::thread::Builder::new()
        .name("ctrl-c-watcher".to_string())
        .spawn(|| {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "Ctrl-C handling unavailable");
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\nBenchmark interrupted by user");
                    std::process::exit(i32::from(EXIT_INTERRUPTED));
                }
            });
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Ctrl-C handling unavailable");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    watch_ctrl_c();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_interrupted(&e) => {
            eprintln!("\nBenchmark interrupted by user");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
