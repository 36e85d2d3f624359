//! Shared fixtures: blank PDFs, a scripted extractor and a scripted judge.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use invoice_bench::{Judge, JudgeError};
use invoice_extract::{
    Extract, ExtractionOutcome, ExtractionResult, InvoiceDocument, ModelSpec, Response,
};
use lopdf::{dictionary, Document, Object};

/// Write a blank PDF with `pages` A4 pages.
pub fn write_pdf(dir: &Path, name: &str, pages: usize) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Extractor that answers from a table keyed by document file name and logs
/// every call.
#[derive(Clone, Default)]
pub struct ScriptedExtractor {
    answers: HashMap<String, String>,
    failing: Vec<String>,
    panicking: Vec<String>,
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedExtractor {
    pub fn answer(mut self, document: &str, text: &str) -> Self {
        self.answers.insert(document.to_string(), text.to_string());
        self
    }

    /// Make every call for `document` fail like an unreachable server.
    pub fn fail(mut self, document: &str) -> Self {
        self.failing.push(document.to_string());
        self
    }

    /// Make every call for `document` panic.
    pub fn panic_on(mut self, document: &str) -> Self {
        self.panicking.push(document.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Extract for ScriptedExtractor {
    fn extract(&self, document: &InvoiceDocument, model: &ModelSpec) -> ExtractionResult {
        self.calls
            .lock()
            .unwrap()
            .push((document.file_name().to_string(), model.tag()));

        if self.panicking.iter().any(|d| d == document.file_name()) {
            panic!("renderer crashed on {}", document.file_name());
        }

        let outcome = if self.failing.iter().any(|d| d == document.file_name()) {
            ExtractionOutcome::Failed("Error: connection refused".to_string())
        } else {
            let text = self
                .answers
                .get(document.file_name())
                .map_or("not json", String::as_str);
            ExtractionOutcome::Completed(Response::new(text))
        };

        ExtractionResult {
            document: document.file_name().to_string(),
            model: model.clone(),
            outcome,
            elapsed: Duration::from_millis(1500),
        }
    }
}

/// Judge that answers from queues and records the transcript.
#[derive(Default)]
pub struct ScriptedJudge {
    pub scores: VecDeque<u32>,
    pub confirms: VecDeque<bool>,
    pub asked: Vec<(String, String, String, u32)>,
    pub notes: Vec<String>,
}

impl ScriptedJudge {
    pub fn with_scores(scores: &[u32]) -> Self {
        Self {
            scores: scores.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> String {
        self.notes.join("\n")
    }
}

impl Judge for ScriptedJudge {
    fn score_field(
        &mut self,
        field: &str,
        expected: &str,
        got: &str,
        max: u32,
    ) -> Result<u32, JudgeError> {
        self.asked
            .push((field.to_string(), expected.to_string(), got.to_string(), max));
        self.scores.pop_front().ok_or(JudgeError::Interrupted)
    }

    fn confirm(&mut self, _question: &str) -> Result<bool, JudgeError> {
        self.confirms.pop_front().ok_or(JudgeError::Interrupted)
    }

    fn note(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }
}

/// JSON answer matching `ACME` expectations exactly.
pub const ACME_ANSWER: &str = r#"```json
{"total_excluding_vat": 10.00, "total_vat": "2.00", "total_including_vat": 12.0, "date": "01/01/2025", "supplier": "acme"}
```"#;
