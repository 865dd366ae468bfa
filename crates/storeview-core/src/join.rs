//! Primary/secondary collection join.
//!
//! Each primary record is paired with at most one secondary record whose
//! match field equals the primary's join key. The secondary collection is
//! indexed once per call, so the join is linear in the size of both inputs.
//! Primary records with a missing, null, or unmatched key are kept with no
//! joined record; the join never drops or reorders primary records.

use std::collections::HashMap;

use crate::models::{key_text, DerivedRecord, RawRecord, DEFAULT_ID_FIELD};

/// Which fields relate the two collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    /// Field on the primary record holding the reference (e.g. `productId`).
    pub join_key: String,
    /// Field on the secondary record the reference points at.
    pub match_field: String,
}

impl JoinSpec {
    /// Join on `join_key` against the secondary's `_id`.
    pub fn new(join_key: impl Into<String>) -> Self {
        Self {
            join_key: join_key.into(),
            match_field: DEFAULT_ID_FIELD.to_string(),
        }
    }

    pub fn with_match_field(mut self, match_field: impl Into<String>) -> Self {
        self.match_field = match_field.into();
        self
    }
}

/// Index records by the key text of `field`. The first record for a key wins.
pub fn index_by<'a>(records: &'a [RawRecord], field: &str) -> HashMap<String, &'a RawRecord> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        if let Some(key) = record.id(field) {
            index.entry(key).or_insert(record);
        }
    }
    index
}

/// Join `primary` against `secondary`, preserving primary order.
///
/// A `None` secondary (not fetched yet) behaves exactly like an empty one.
pub fn join_records<'a>(
    primary: &'a [RawRecord],
    secondary: Option<&'a [RawRecord]>,
    spec: &JoinSpec,
) -> Vec<DerivedRecord<'a>> {
    let index = index_by(secondary.unwrap_or_default(), &spec.match_field);

    primary
        .iter()
        .map(|record| {
            let joined = record
                .get(&spec.join_key)
                .and_then(key_text)
                .and_then(|key| index.get(&key).copied());
            DerivedRecord::new(record, joined)
        })
        .collect()
}
