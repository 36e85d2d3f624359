//! Scores for fields the equality check could not settle.
//!
//! A [`Judge`] is consulted once per mismatched field and must answer with an
//! integer in `0..=max`. [`ConsoleJudge`] asks a human on a terminal and
//! re-prompts until the answer is valid. Tests plug in a scripted judge.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use thiserror::Error;
use tracing::warn;

/// Why a judge could not answer.
#[derive(Error, Debug)]
pub enum JudgeError {
    /// The input stream closed while waiting for an answer.
    #[error("input closed while waiting for a rating")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// `true` when `error` was caused by the judge's input closing.
#[must_use]
pub fn is_interrupted(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<JudgeError>(), Some(JudgeError::Interrupted)))
}

/// Whoever settles mismatched fields and confirms documents.
///
/// The judge also owns the transcript: [`Judge::note`] lines are what a human
/// reads while rating.
pub trait Judge {
    /// Score a mismatched field in `0..=max`.
    ///
    /// # Errors
    ///
    /// Returns [`JudgeError::Interrupted`] when no answer can be obtained.
    fn score_field(&mut self, field: &str, expected: &str, got: &str, max: u32)
        -> Result<u32, JudgeError>;

    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns [`JudgeError::Interrupted`] when no answer can be obtained.
    fn confirm(&mut self, question: &str) -> Result<bool, JudgeError>;

    /// Show a line of the rating transcript.
    fn note(&mut self, message: &str);
}

/// Interactive judge reading answers from `input` and writing prompts to
/// `output`.
pub struct ConsoleJudge<R, W> {
    input: R,
    output: W,
}

impl ConsoleJudge<StdinLock<'static>, Stdout> {
    /// Judge on the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleJudge<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the judge and return its output stream.
    pub fn into_output(self) -> W {
        self.output
    }

    fn prompt(&mut self, text: &str) -> Result<String, JudgeError> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(JudgeError::Interrupted);
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Judge for ConsoleJudge<R, W> {
    fn score_field(
        &mut self,
        field: &str,
        expected: &str,
        got: &str,
        max: u32,
    ) -> Result<u32, JudgeError> {
        writeln!(self.output, "Rate {field}:")?;
        let question = format!("Expected: {expected}, Got: {got}. Rate 0-{max}: ");
        loop {
            let answer = self.prompt(&question)?;
            match answer.parse::<i64>() {
                Ok(n) if (0..=i64::from(max)).contains(&n) => {
                    return Ok(u32::try_from(n).unwrap_or(max));
                }
                Ok(_) => writeln!(self.output, "Please enter a number between 0 and {max}.")?,
                Err(_) => writeln!(self.output, "Please enter a valid integer.")?,
            }
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool, JudgeError> {
        let question = format!("{question} (y/n): ");
        loop {
            match self.prompt(&question)?.to_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => writeln!(self.output, "Invalid response. Please enter 'y' or 'n'.")?,
            }
        }
    }

    /// A failed write is logged; the next prompt surfaces it as an error.
    fn note(&mut self, message: &str) {
        if let Err(e) = writeln!(self.output, "{message}") {
            warn!(error = %e, "Could not write rating transcript");
        }
    }
}
