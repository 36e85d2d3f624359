//! Field-level scoring of extracted invoices.
//!
//! Each of the five fields carries a fixed weight; the weights sum to 100.
//! A field whose extracted value [`values_equal`] the expected one earns its
//! full weight without asking anybody. Any other field is handed to a
//! [`Judge`], whose answer is capped at the field's weight.
//!
//! An answer that is not valid JSON scores 0 and no field is looked at.

use invoice_extract::{ExtractionResult, FieldValue, InvoiceFields};

use crate::catalog::ExpectedFields;
use crate::judge::{Judge, JudgeError};

/// Tolerance for numeric equality.
pub const NUMERIC_TOLERANCE: f64 = 1e-6;

/// A scored invoice field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    TotalExcludingVat,
    TotalVat,
    TotalIncludingVat,
    Date,
    Supplier,
}

impl Field {
    /// All fields, in rating order.
    pub const ALL: [Self; 5] = [
        Self::TotalExcludingVat,
        Self::TotalVat,
        Self::TotalIncludingVat,
        Self::Date,
        Self::Supplier,
    ];

    /// JSON key of the field.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TotalExcludingVat => "total_excluding_vat",
            Self::TotalVat => "total_vat",
            Self::TotalIncludingVat => "total_including_vat",
            Self::Date => "date",
            Self::Supplier => "supplier",
        }
    }

    /// Maximum points for the field.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::TotalExcludingVat | Self::TotalVat | Self::TotalIncludingVat => 15,
            Self::Date => 25,
            Self::Supplier => 30,
        }
    }

    fn expected(self, fields: &ExpectedFields) -> Option<&FieldValue> {
        match self {
            Self::TotalExcludingVat => fields.total_excluding_vat.as_ref(),
            Self::TotalVat => fields.total_vat.as_ref(),
            Self::TotalIncludingVat => fields.total_including_vat.as_ref(),
            Self::Date => fields.date.as_ref(),
            Self::Supplier => fields.supplier.as_ref(),
        }
    }

    fn extracted(self, fields: &InvoiceFields) -> Option<&FieldValue> {
        match self {
            Self::TotalExcludingVat => fields.total_excluding_vat.as_ref(),
            Self::TotalVat => fields.total_vat.as_ref(),
            Self::TotalIncludingVat => fields.total_including_vat.as_ref(),
            Self::Date => fields.date.as_ref(),
            Self::Supplier => fields.supplier.as_ref(),
        }
    }
}

/// Lenient equality between an expected and an extracted value.
///
/// 1. Nothing expected, and nothing (or blank, or the literal `None`) got.
/// 2. Both parse as numbers within [`NUMERIC_TOLERANCE`].
/// 3. Both are equal after trimming and lowercasing.
#[must_use]
pub fn values_equal(expected: Option<&FieldValue>, got: Option<&FieldValue>) -> bool {
    let (expected, got) = match (expected, got) {
        (None, None) => return true,
        (None, Some(got)) => {
            let text = got.to_string();
            return text.trim().is_empty() || text == "None";
        }
        (Some(_), None) => return false,
        (Some(expected), Some(got)) => (expected, got),
    };

    if let (Some(a), Some(b)) = (expected.as_f64(), got.as_f64()) {
        if (a - b).abs() <= NUMERIC_TOLERANCE {
            return true;
        }
    }

    expected.to_string().trim().to_lowercase() == got.to_string().trim().to_lowercase()
}

fn display(value: Option<&FieldValue>) -> String {
    value.map_or_else(|| "None".to_string(), ToString::to_string)
}

/// Score extracted fields against expectations, consulting `judge` for every
/// mismatch. Returns a total in `0..=100`.
///
/// # Errors
///
/// Returns [`JudgeError`] if the judge cannot answer.
pub fn score_fields(
    expected: &ExpectedFields,
    extracted: &InvoiceFields,
    judge: &mut dyn Judge,
) -> Result<u32, JudgeError> {
    let mut total = 0;
    for field in Field::ALL {
        let exp = field.expected(expected);
        let got = field.extracted(extracted);
        let weight = field.weight();
        if values_equal(exp, got) {
            judge.note(&format!(
                "Expected == Got for {} ({}) -> awarding full {weight} points",
                field.name(),
                display(exp)
            ));
            total += weight;
        } else {
            let score = judge.score_field(field.name(), &display(exp), &display(got), weight)?;
            total += score.min(weight);
        }
    }
    Ok(total)
}

/// Show an extraction to the judge and rate it.
///
/// Unparseable answers score exactly 0.0 without any field comparison.
///
/// # Errors
///
/// Returns [`JudgeError`] if the judge cannot answer.
pub fn rate_response(
    result: &ExtractionResult,
    expected: &ExpectedFields,
    judge: &mut dyn Judge,
) -> Result<f64, JudgeError> {
    judge.note(result.raw_text());

    let fields = match result.fields() {
        Ok(fields) => fields,
        Err(e) => {
            judge.note(&format!("Deserialization error: {e}"));
            return Ok(0.0);
        }
    };

    let total = score_fields(expected, &fields, judge)?;
    judge.note(&format!("Total grade: {total}/100"));
    Ok(f64::from(total))
}
