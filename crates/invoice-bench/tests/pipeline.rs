//! End-to-end runs of the benchmark modes with a scripted extractor and judge.

mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use invoice_bench::benchmark::{run_batch, run_threaded, run_with_rating};
use invoice_bench::{
    load_processed_keys, BenchConfig, Consumer, ExpectedFields, QueueItem, RecordKey,
    RecordStore, ScoreRecord, StartPoint,
};
use invoice_extract::{DocumentError, ModelSpec};
use tempfile::TempDir;

use common::{write_pdf, ScriptedExtractor, ScriptedJudge, ACME_ANSWER};

fn models() -> Vec<ModelSpec> {
    vec![ModelSpec::new("m", 3, 1.0), ModelSpec::new("m", 7, 4.5)]
}

fn acme() -> ExpectedFields {
    ExpectedFields::new(10.0, 2.0, 12.0, "01/01/2025", "ACME")
}

/// Config rooted in a temp dir with single-page `a.pdf` and `b.pdf`.
fn setup() -> (TempDir, BenchConfig) {
    let root = tempfile::tempdir().unwrap();
    let pdf_dir = root.path().join("pdf");
    fs::create_dir(&pdf_dir).unwrap();
    write_pdf(&pdf_dir, "a.pdf", 1);
    write_pdf(&pdf_dir, "b.pdf", 1);

    let mut expected = BTreeMap::new();
    expected.insert("a.pdf".to_string(), acme());
    expected.insert("b.pdf".to_string(), acme());

    let config = BenchConfig {
        pdf_dir,
        output_dir: root.path().join("out"),
        poll_interval_ms: 10,
        models: models(),
        expected,
        ..BenchConfig::default()
    };
    (root, config)
}

fn progress_rows(path: &Path) -> Vec<ScoreRecord> {
    csv::Reader::from_path(path)
        .unwrap()
        .deserialize()
        .map(Result::unwrap)
        .collect()
}

#[test]
fn test_threaded_resume_skips_recorded_pairs() {
    let (_root, config) = setup();

    // A previous run already rated a.pdf with m:3b
    let mut store = RecordStore::open(config.progress_csv_path()).unwrap();
    store
        .append(ScoreRecord::new(&models()[0], "a.pdf", 3.0, 100.0))
        .unwrap();
    drop(store);

    let extractor = ScriptedExtractor::default()
        .answer("a.pdf", ACME_ANSWER)
        .answer("b.pdf", ACME_ANSWER);
    let mut judge = ScriptedJudge::default();

    let summary =
        run_threaded(&config, &StartPoint::Beginning, extractor.clone(), &mut judge).unwrap();

    assert_eq!(
        extractor.calls(),
        vec![
            ("a.pdf".to_string(), "m:7b".to_string()),
            ("b.pdf".to_string(), "m:3b".to_string()),
            ("b.pdf".to_string(), "m:7b".to_string()),
        ]
    );
    assert_eq!(summary.rated, 3);
    // Every field matched, so nobody was asked
    assert!(judge.asked.is_empty());

    let rows = progress_rows(&config.progress_csv_path());
    assert_eq!(rows.len(), 4);
    assert!(rows[1..].iter().all(|r| (r.user_rating_percentage - 100.0).abs() < f64::EPSILON));

    let keys = load_processed_keys(&config.progress_csv_path());
    for doc in ["a.pdf", "b.pdf"] {
        for model in models() {
            assert!(keys.contains(&RecordKey::new(doc, &model)));
        }
    }

    // Side files in run folder 1, metrics snapshot in run folder 2
    let side_dir = config.output_dir.join("1");
    assert!(side_dir.join("a__m__7b__1s.json").is_file());
    assert!(side_dir.join("b__m__3b__1s.json").is_file());
    assert!(!side_dir.join("a__m__3b__1s.json").exists());
    assert_eq!(summary.run_dir, config.output_dir.join("2"));
    let snapshot = fs::read_to_string(&summary.metrics_csv).unwrap();
    assert_eq!(snapshot.lines().count(), 4);

    // A second run finds nothing left to do
    let extractor = ScriptedExtractor::default();
    let mut judge = ScriptedJudge::default();
    let summary = run_threaded(&config, &StartPoint::Beginning, extractor.clone(), &mut judge)
        .unwrap();
    assert!(extractor.calls().is_empty());
    assert_eq!(summary.rated, 0);
}

#[test]
fn test_threaded_rates_in_document_major_order() {
    let (_root, config) = setup();
    let extractor = ScriptedExtractor::default()
        .answer("a.pdf", ACME_ANSWER)
        .answer("b.pdf", ACME_ANSWER);
    let mut judge = ScriptedJudge::default();

    run_threaded(&config, &StartPoint::Beginning, extractor, &mut judge).unwrap();

    let rated: Vec<(String, u32)> = progress_rows(&config.progress_csv_path())
        .into_iter()
        .map(|r| (r.document_id, r.model_parameters))
        .collect();
    assert_eq!(
        rated,
        vec![
            ("a.pdf".to_string(), 3),
            ("a.pdf".to_string(), 7),
            ("b.pdf".to_string(), 3),
            ("b.pdf".to_string(), 7),
        ]
    );
    assert!(judge
        .transcript()
        .contains("Worker completed and sent completion signal. Ending rating loop."));
}

#[test]
fn test_threaded_start_file() {
    let (_root, config) = setup();
    let extractor = ScriptedExtractor::default().answer("b.pdf", ACME_ANSWER);
    let mut judge = ScriptedJudge::default();

    run_threaded(
        &config,
        &StartPoint::File("b.pdf".into()),
        extractor.clone(),
        &mut judge,
    )
    .unwrap();

    assert!(extractor.calls().iter().all(|(doc, _)| doc == "b.pdf"));
    assert_eq!(extractor.calls().len(), 2);
}

#[test]
fn test_unparseable_and_failed_answers_score_zero_without_prompts() {
    let (_root, config) = setup();
    // a.pdf answers "not json"; b.pdf calls fail outright
    let extractor = ScriptedExtractor::default().fail("b.pdf");
    let mut judge = ScriptedJudge::default();

    let summary = run_threaded(&config, &StartPoint::Beginning, extractor, &mut judge).unwrap();

    assert_eq!(summary.rated, 4);
    assert!(judge.asked.is_empty());
    let rows = progress_rows(&config.progress_csv_path());
    assert!(rows.iter().all(|r| r.user_rating_percentage == 0.0));
    assert!(judge.transcript().contains("Deserialization error"));

    let side = fs::read_to_string(config.output_dir.join("1").join("b__m__3b__1s.json")).unwrap();
    assert_eq!(side, "Error: connection refused");
}

#[test]
fn test_panicking_extractor_is_rated_as_failure() {
    let (_root, config) = setup();
    let extractor = ScriptedExtractor::default()
        .panic_on("a.pdf")
        .answer("b.pdf", ACME_ANSWER);
    let mut judge = ScriptedJudge::default();

    let summary =
        run_threaded(&config, &StartPoint::Beginning, extractor.clone(), &mut judge).unwrap();

    // The worker survives and goes on to b.pdf
    assert_eq!(summary.rated, 4);
    assert_eq!(extractor.calls().len(), 4);
    let ratings: Vec<f64> = progress_rows(&config.progress_csv_path())
        .iter()
        .map(|r| r.user_rating_percentage)
        .collect();
    assert_eq!(ratings, vec![0.0, 0.0, 100.0, 100.0]);

    let side = fs::read_to_string(config.output_dir.join("1").join("a__m__3b__0s.json")).unwrap();
    assert_eq!(side, "Error: extraction panicked: renderer crashed on a.pdf");
}

#[test]
fn test_mismatched_date_is_judged_within_weight() {
    let (_root, mut config) = setup();
    config.models.truncate(1);
    write_pdf(&config.pdf_dir, "invoice-test-1.pdf", 1);
    config.expected.insert(
        "invoice-test-1.pdf".to_string(),
        ExpectedFields::new(62.52, 12.50, 75.02, "26/08/2025", "Station Mairie ARVIEU"),
    );
    fs::remove_file(config.pdf_dir.join("a.pdf")).unwrap();
    fs::remove_file(config.pdf_dir.join("b.pdf")).unwrap();

    let extractor = ScriptedExtractor::default().answer(
        "invoice-test-1.pdf",
        r#"{"total_excluding_vat": 62.52, "total_vat": 12.5, "total_including_vat": 75.02,
            "date": "2025-08-26", "supplier": "Station Mairie ARVIEU"}"#,
    );
    let mut judge = ScriptedJudge::with_scores(&[20]);

    run_threaded(&config, &StartPoint::Beginning, extractor, &mut judge).unwrap();

    assert_eq!(
        judge.asked,
        vec![(
            "date".to_string(),
            "26/08/2025".to_string(),
            "2025-08-26".to_string(),
            25
        )]
    );
    assert!(judge.transcript().contains(
        "Expected == Got for supplier (Station Mairie ARVIEU) -> awarding full 30 points"
    ));
    let rows = progress_rows(&config.progress_csv_path());
    assert_eq!(rows[0].user_rating_percentage, 95.0);
}

#[test]
fn test_multi_page_input_stops_run_before_extraction() {
    let (_root, config) = setup();
    write_pdf(&config.pdf_dir, "c.pdf", 2);
    let extractor = ScriptedExtractor::default();
    let mut judge = ScriptedJudge::default();

    let err = run_threaded(&config, &StartPoint::Beginning, extractor.clone(), &mut judge)
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DocumentError>(),
        Some(DocumentError::MultiPage { pages: 2, .. })
    ));
    assert!(extractor.calls().is_empty());
}

#[test]
fn test_interrupted_judge_keeps_rows_already_written() {
    let (_root, config) = setup();
    // First answer matches; second has a wrong supplier and the judge is gone
    let extractor = ScriptedExtractor::default()
        .answer("a.pdf", ACME_ANSWER)
        .answer(
            "b.pdf",
            r#"{"total_excluding_vat": 10, "total_vat": 2, "total_including_vat": 12,
                "date": "01/01/2025", "supplier": "Other"}"#,
        );
    let mut judge = ScriptedJudge::default();

    let err = run_threaded(&config, &StartPoint::Beginning, extractor, &mut judge).unwrap_err();
    assert!(invoice_bench::is_interrupted(&err));
    assert_eq!(progress_rows(&config.progress_csv_path()).len(), 2);
}

#[test]
fn test_consumer_waits_through_timeouts() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RecordStore::open(dir.path().join("progress.csv")).unwrap();
    let expected = BTreeMap::new();
    let mut judge = ScriptedJudge::default();

    let (tx, rx) = unbounded();
    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        tx.send(QueueItem::Done).unwrap();
    });

    let rated = Consumer::new(&mut judge, &mut store, &expected, Duration::from_millis(5))
        .run(&rx)
        .unwrap();
    sender.join().unwrap();

    assert_eq!(rated, 0);
    assert!(judge
        .notes
        .iter()
        .any(|n| n == "No responses to rate at the moment. Waiting..."));
}

#[test]
fn test_consumer_fails_if_worker_vanishes() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RecordStore::open(dir.path().join("progress.csv")).unwrap();
    let expected = BTreeMap::new();
    let mut judge = ScriptedJudge::default();

    let (tx, rx) = unbounded::<QueueItem>();
    drop(tx);

    let err = Consumer::new(&mut judge, &mut store, &expected, Duration::from_millis(5))
        .run(&rx)
        .unwrap_err();
    assert!(err.to_string().contains("without signalling completion"));
}

#[test]
fn test_batch_writes_timed_side_files() {
    let (_root, config) = setup();
    let extractor = ScriptedExtractor::default().answer("a.pdf", ACME_ANSWER);
    let mut out = Vec::new();

    let summary = run_batch(&config, &models()[1], &extractor, &mut out).unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.run_dir, config.output_dir.join("1"));
    assert!((summary.total_secs - 3.0).abs() < 1e-9);
    let a = fs::read_to_string(summary.run_dir.join("a__m__00-01.json")).unwrap();
    assert!(a.starts_with('{'));
    assert!(summary.run_dir.join("b__m__00-01.json").is_file());

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Processing [1/2] a.pdf..."));
    assert!(out.contains("Done [2/2] b.pdf - took 00:01, ETA 00:00 - 100.0%"));
    // Batch mode never touches the progress CSV
    assert!(!config.progress_csv_path().exists());
}

#[test]
fn test_batch_empty_directory_is_error() {
    let root = tempfile::tempdir().unwrap();
    let config = BenchConfig {
        pdf_dir: root.path().to_path_buf(),
        output_dir: root.path().join("out"),
        ..BenchConfig::default()
    };
    let err = run_batch(
        &config,
        &models()[0],
        &ScriptedExtractor::default(),
        &mut Vec::new(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("No PDF files found"));
}

#[test]
fn test_rate_mode_runs_only_confirmed_documents() {
    let (_root, config) = setup();
    let extractor = ScriptedExtractor::default()
        .answer("a.pdf", ACME_ANSWER)
        .answer("b.pdf", ACME_ANSWER);
    let mut judge = ScriptedJudge {
        confirms: [false, true].into_iter().collect(),
        ..ScriptedJudge::default()
    };

    let summary = run_with_rating(&config, &extractor, &mut judge).unwrap();

    assert_eq!(
        extractor.calls(),
        vec![
            ("b.pdf".to_string(), "m:3b".to_string()),
            ("b.pdf".to_string(), "m:7b".to_string()),
        ]
    );
    assert_eq!(summary.rated, 2);
    assert_eq!(summary.metrics_csv, config.output_dir.join("1").join("metrics.csv"));
    assert!(config.output_dir.join("1").join("b__m__00-01.json").is_file());
    assert_eq!(progress_rows(&summary.metrics_csv).len(), 2);
    assert!(judge.transcript().contains("Evaluating model: m with 3B parameters and size 1GB"));
}
