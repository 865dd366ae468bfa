//! Aggregation over derived records: class counts and numeric totals.
//!
//! Both aggregations visit each record exactly once and never drop a
//! record. Records a classifier cannot place land in the explicit
//! `unclassified` bucket; records without a usable amount are counted in
//! `missing` and contribute 0.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::{key_text, DerivedRecord};

/// Label reported for records the classifier could not place.
pub const UNCLASSIFIED: &str = "unclassified";

/// Assigns a class label to a derived record, or `None` when it has none.
pub trait Classifier {
    fn classify(&self, record: &DerivedRecord<'_>) -> Option<String>;
}

impl<F> Classifier for F
where
    F: Fn(&DerivedRecord<'_>) -> Option<String>,
{
    fn classify(&self, record: &DerivedRecord<'_>) -> Option<String> {
        self(record)
    }
}

/// Classify by the text form of a field (e.g. `status`).
///
/// Missing, null, empty, and structured values are unclassified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldClassifier {
    path: String,
}

impl FieldClassifier {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Classifier for FieldClassifier {
    fn classify(&self, record: &DerivedRecord<'_>) -> Option<String> {
        record
            .get(&self.path)
            .and_then(key_text)
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
    }
}

/// Classify by whether the join found a secondary record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinClassifier;

impl JoinClassifier {
    pub const MATCHED: &'static str = "matched";
    pub const UNMATCHED: &'static str = "unmatched";
}

impl Classifier for JoinClassifier {
    fn classify(&self, record: &DerivedRecord<'_>) -> Option<String> {
        let label = if record.is_matched() {
            Self::MATCHED
        } else {
            Self::UNMATCHED
        };
        Some(label.to_string())
    }
}

/// Record counts per class label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Counts per label, ordered by label.
    pub buckets: BTreeMap<String, usize>,
    pub unclassified: usize,
    /// Number of records visited; always `sum(buckets) + unclassified`.
    pub total: usize,
}

impl Summary {
    /// Count for `label`; [`UNCLASSIFIED`] reads the unclassified bucket.
    pub fn count(&self, label: &str) -> usize {
        if label == UNCLASSIFIED {
            return self.unclassified;
        }
        self.buckets.get(label).copied().unwrap_or(0)
    }
}

/// Group records by `classifier` and count each class.
pub fn compute_summary<C>(records: &[DerivedRecord<'_>], classifier: &C) -> Summary
where
    C: Classifier + ?Sized,
{
    let mut summary = Summary::default();
    for record in records {
        match classifier.classify(record) {
            Some(label) => *summary.buckets.entry(label).or_insert(0) += 1,
            None => summary.unclassified += 1,
        }
        summary.total += 1;
    }
    summary
}

/// Sum of a numeric field over records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total: f64,
    /// Records that contributed a usable amount.
    pub counted: usize,
    /// Records whose amount was missing or non-numeric (counted as 0).
    pub missing: usize,
}

/// Read a value as a finite number, accepting numeric strings.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Sum `amount_path` over records, multiplied by `quantity_path` when given.
///
/// A missing or malformed quantity counts as 1.
pub fn compute_totals(
    records: &[DerivedRecord<'_>],
    amount_path: &str,
    quantity_path: Option<&str>,
) -> Totals {
    let mut totals = Totals::default();
    for record in records {
        let Some(amount) = record.get(amount_path).and_then(numeric_value) else {
            totals.missing += 1;
            continue;
        };
        let quantity = quantity_path
            .and_then(|path| record.get(path))
            .and_then(numeric_value)
            .unwrap_or(1.0);
        totals.total += amount * quantity;
        totals.counted += 1;
    }
    totals
}
