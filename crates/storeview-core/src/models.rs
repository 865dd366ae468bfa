//! Record types that flow through the derived-collection pipeline.
//!
//! A [`RawRecord`] is a JSON object exactly as a remote source returned it.
//! A [`DerivedRecord`] borrows a primary record together with the secondary
//! record the join matched, if any. Field access on either accepts dotted
//! paths into nested objects (`user.email`); on a derived record the
//! `joined.` prefix addresses the matched secondary record.
//!
//! The name `joined` is reserved on derived records. A primary record that
//! carries its own `joined` field keeps it in [`DerivedRecord::record`], but
//! path lookups and serialized output never expose it through the derived
//! record.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default identifier field of records returned by the backend.
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Key under which a derived record nests its matched secondary record.
pub const JOIN_FIELD: &str = "joined";

/// Path prefix that resolves a field against the joined secondary record.
pub const JOIN_PREFIX: &str = "joined.";

/// An externally sourced record, treated as immutable input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Look up a field by name or dotted path.
    ///
    /// An exact key match wins over path traversal, so a field literally
    /// named `a.b` is still reachable.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Canonical key text of the identifier stored under `field`.
    pub fn id(&self, field: &str) -> Option<String> {
        self.get(field).and_then(key_text)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// A primary record plus the secondary record the join matched.
///
/// Serializes as the primary record's fields with the match nested under
/// `joined` (omitted when there was no match). A primary field named
/// `joined` is always dropped from the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedRecord<'a> {
    pub record: &'a RawRecord,
    pub joined: Option<&'a RawRecord>,
}

impl Serialize for DerivedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in self.record.fields() {
            if key != JOIN_FIELD {
                map.serialize_entry(key, value)?;
            }
        }
        if let Some(joined) = self.joined {
            map.serialize_entry(JOIN_FIELD, joined)?;
        }
        map.end()
    }
}

impl<'a> DerivedRecord<'a> {
    pub fn new(record: &'a RawRecord, joined: Option<&'a RawRecord>) -> Self {
        Self { record, joined }
    }

    /// A derived record with no secondary match.
    pub fn unjoined(record: &'a RawRecord) -> Self {
        Self {
            record,
            joined: None,
        }
    }

    /// Resolve a field path; `joined.<path>` reads from the matched record.
    ///
    /// A bare `joined` never resolves, even when the primary has such a field.
    pub fn get(&self, path: &str) -> Option<&'a Value> {
        if path == JOIN_FIELD {
            return None;
        }
        match path.strip_prefix(JOIN_PREFIX) {
            Some(rest) => self.joined?.get(rest),
            None => self.record.get(path),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.joined.is_some()
    }
}

/// Text form of a value used as a join or identifier key.
///
/// Strings, numbers, and booleans have a key form, so `"7"` and `7` compare
/// equal. Null, arrays, and objects have none.
pub fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text form of a value for free-text search.
///
/// Arrays of scalars are joined with spaces; objects and null yield nothing.
pub fn search_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(key_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        other => key_text(other),
    }
}
