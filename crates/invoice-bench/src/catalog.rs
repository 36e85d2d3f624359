//! Default model catalog and expected invoice values.
//!
//! These are only defaults. The harness reads both from [`crate::BenchConfig`],
//! which a TOML file can replace wholesale.

use std::collections::BTreeMap;

use invoice_extract::{FieldValue, ModelSpec};
use serde::{Deserialize, Serialize};

/// Ground truth for one invoice.
///
/// A missing field means the invoice does not show that value; a model that
/// also returns nothing for it is scored as correct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedFields {
    pub total_excluding_vat: Option<FieldValue>,
    pub total_vat: Option<FieldValue>,
    pub total_including_vat: Option<FieldValue>,
    pub date: Option<FieldValue>,
    pub supplier: Option<FieldValue>,
}

impl ExpectedFields {
    /// Fully populated expectation.
    #[must_use]
    pub fn new(excl: f64, vat: f64, incl: f64, date: &str, supplier: &str) -> Self {
        Self {
            total_excluding_vat: Some(excl.into()),
            total_vat: Some(vat.into()),
            total_including_vat: Some(incl.into()),
            date: Some(date.into()),
            supplier: Some(supplier.into()),
        }
    }
}

/// The five vision models benchmarked by default.
#[must_use]
pub fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new("qwen2.5vl", 3, 3.2),
        ModelSpec::new("qwen2.5vl", 7, 6.0),
        ModelSpec::new("granite3.2-vision", 2, 2.4),
        ModelSpec::new("qwen2.5vl", 32, 21.0),
        ModelSpec::new("mistral-small3.2", 24, 15.0),
    ]
}

/// Expected values for the bundled test invoices, keyed by file name.
#[must_use]
pub fn default_expected() -> BTreeMap<String, ExpectedFields> {
    let arvieu = ExpectedFields::new(62.52, 12.50, 75.02, "26/08/2025", "Station Mairie ARVIEU");
    let malrieu = ExpectedFields::new(10.21, 2.04, 12.25, "03/07/2025", "MALRIEU DISTRIBUTION SAS");
    let totals_only = |incl: f64, date: &str, supplier: &str| ExpectedFields {
        total_including_vat: Some(incl.into()),
        date: Some(date.into()),
        supplier: Some(supplier.into()),
        ..ExpectedFields::default()
    };

    [
        ("invoice-test-1.pdf", arvieu.clone()),
        ("invoice-test-2.pdf", arvieu.clone()),
        ("invoice-test-3.pdf", arvieu),
        (
            "invoice-test-4.pdf",
            ExpectedFields::new(23.38, 4.68, 28.06, "27/08/2025", "SARL GARAGE MONTEILLET"),
        ),
        (
            "invoice-test-5.pdf",
            ExpectedFields::new(28.18, 2.82, 31.00, "03/07/2025", "Restaurant L'atelier"),
        ),
        // Not an invoice: nothing should be extracted.
        ("invoice-test-6.pdf", ExpectedFields::default()),
        (
            "invoice-test-7.pdf",
            ExpectedFields::new(32.98, 6.60, 39.57, "04/07/2025", "BRICO DEPOT"),
        ),
        (
            "invoice-test-8.pdf",
            ExpectedFields::new(32.98, 6.60, 39.57, "04/07/2025", "Brico Dépôt S.A.S."),
        ),
        (
            "invoice-test-9.pdf",
            totals_only(56.80, "04/07/2025", "CREDIT AGRICOLE"),
        ),
        (
            "invoice-test-10.pdf",
            totals_only(12.25, "03/07/2025", "MALRIEU SA"),
        ),
        ("invoice-test-11.pdf", malrieu.clone()),
        ("invoice-test-12.pdf", malrieu),
    ]
    .into_iter()
    .map(|(name, fields)| (name.to_string(), fields))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_tags() {
        let tags: Vec<String> = default_models().iter().map(ModelSpec::tag).collect();
        assert_eq!(
            tags,
            [
                "qwen2.5vl:3b",
                "qwen2.5vl:7b",
                "granite3.2-vision:2b",
                "qwen2.5vl:32b",
                "mistral-small3.2:24b"
            ]
        );
    }

    #[test]
    fn test_default_expected_covers_twelve_invoices() {
        let expected = default_expected();
        assert_eq!(expected.len(), 12);
        assert_eq!(
            expected["invoice-test-1.pdf"].supplier,
            Some(FieldValue::from("Station Mairie ARVIEU"))
        );
        assert_eq!(expected["invoice-test-6.pdf"], ExpectedFields::default());
        assert!(expected["invoice-test-10.pdf"].total_vat.is_none());
    }
}
