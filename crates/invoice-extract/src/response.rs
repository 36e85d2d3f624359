//! Model answers and the invoice fields parsed out of them.
//!
//! Vision models tend to wrap JSON in Markdown code fences even when told not
//! to. [`Response::new`] removes every fence marker up front; the cleaned text
//! is what gets written to side files and shown to the judge.
//! [`Response::deserialize`] then parses the five invoice fields.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ParseError;

/// Cleaned text of a model answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    text: String,
}

impl Response {
    /// Wrap a raw answer, stripping ```` ```json ```` / ```` ``` ```` markers.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let text = raw.replace("```json", "").replace("```", "").trim().to_string();
        Self { text }
    }

    /// Cleaned text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Parse the invoice fields.
    ///
    /// Missing keys and explicit `null`s both come back as `None`; only a
    /// payload that is not a JSON object fails.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the text is not valid JSON.
    pub fn deserialize(&self) -> Result<InvoiceFields, ParseError> {
        serde_json::from_str(&self.text).map_err(|e| ParseError::new(e, &self.text))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A scalar read from the model's JSON.
///
/// Models are inconsistent about quoting numbers, so both shapes are kept and
/// compared leniently later on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A JSON number
    Number(f64),
    /// A JSON string
    Text(String),
    /// Anything else (booleans, arrays, objects)
    Other(serde_json::Value),
}

impl FieldValue {
    /// Numeric view of the value, accepting numeric strings.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// The five invoice fields a model is asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceFields {
    /// Total before VAT
    pub total_excluding_vat: Option<FieldValue>,
    /// VAT amount
    pub total_vat: Option<FieldValue>,
    /// Total including VAT
    pub total_including_vat: Option<FieldValue>,
    /// Invoice date, expected as `DD/MM/YYYY`
    pub date: Option<FieldValue>,
    /// Supplier name
    pub supplier: Option<FieldValue>,
}
