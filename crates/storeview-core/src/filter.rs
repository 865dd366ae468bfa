//! Search and date-range filtering over derived records.
//!
//! Filtering never fails: a record whose searched or dated field is
//! missing or malformed simply does not match.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{search_text, DerivedRecord, JOIN_FIELD};

/// Decides whether a derived record matches a free-text search term.
///
/// Implemented for [`FieldSearch`] and for any
/// `Fn(&DerivedRecord, &str) -> bool` closure.
pub trait SearchPredicate {
    fn matches(&self, record: &DerivedRecord<'_>, term: &str) -> bool;
}

impl<F> SearchPredicate for F
where
    F: Fn(&DerivedRecord<'_>, &str) -> bool,
{
    fn matches(&self, record: &DerivedRecord<'_>, term: &str) -> bool {
        self(record, term)
    }
}

/// Case-insensitive substring search across a set of field paths.
///
/// With no fields configured, every top-level scalar field of the primary
/// and joined records is searched. A blank term matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSearch {
    fields: Vec<String>,
}

impl FieldSearch {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    fn haystacks<'r>(&self, record: &DerivedRecord<'r>) -> Vec<&'r Value> {
        if !self.fields.is_empty() {
            return self.fields.iter().filter_map(|f| record.get(f)).collect();
        }
        let mut values: Vec<&'r Value> = record
            .record
            .fields()
            .iter()
            .filter(|(key, _)| key.as_str() != JOIN_FIELD)
            .map(|(_, value)| value)
            .collect();
        if let Some(joined) = record.joined {
            values.extend(joined.fields().values());
        }
        values
    }
}

impl SearchPredicate for FieldSearch {
    fn matches(&self, record: &DerivedRecord<'_>, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.haystacks(record)
            .into_iter()
            .filter_map(search_text)
            .any(|text| text.to_lowercase().contains(&needle))
    }
}

/// Inclusive calendar-day range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// True when neither end is set, i.e. the range filters nothing.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Parse a record's date value into a UTC calendar date.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.f]` or
/// `YYYY-MM-DD HH:MM:SS` timestamps (taken as UTC), bare `YYYY-MM-DD`
/// dates, and integer Unix timestamps in milliseconds.
pub fn parse_date_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
        }
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Keep records inside `range` by the date stored at `date_field`.
pub fn in_date_range(record: &DerivedRecord<'_>, date_field: &str, range: &DateRange) -> bool {
    if range.is_unbounded() {
        return true;
    }
    record
        .get(date_field)
        .and_then(parse_date_value)
        .is_some_and(|date| range.contains(date))
}

/// Apply the search predicate and optional date range, preserving order.
///
/// A date range without a date field filters nothing.
pub fn filter_records<'a, P>(
    records: Vec<DerivedRecord<'a>>,
    predicate: &P,
    term: &str,
    date_field: Option<&str>,
    range: Option<&DateRange>,
) -> Vec<DerivedRecord<'a>>
where
    P: SearchPredicate + ?Sized,
{
    let date_filter = date_field.zip(range);
    records
        .into_iter()
        .filter(|record| predicate.matches(record, term))
        .filter(|record| match date_filter {
            Some((field, range)) => in_date_range(record, field, range),
            None => true,
        })
        .collect()
}
