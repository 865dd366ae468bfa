//! In-memory [`RecordSource`] for tests and embedding hosts.
//!
//! Holds a snapshot behind `std::sync::RwLock`. [`InMemorySource::replace`]
//! swaps the whole collection, mirroring a refetch after a mutation.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::RawRecord;

use super::RecordSource;

pub struct InMemorySource {
    name: String,
    records: RwLock<Vec<RawRecord>>,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(records),
        }
    }

    /// Replace the collection wholesale.
    pub fn replace(&self, records: Vec<RawRecord>) -> Result<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| anyhow!("record source '{}' lock poisoned", self.name))?;
        *guard = records;
        Ok(())
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let guard = self
            .records
            .read()
            .map_err(|_| anyhow!("record source '{}' lock poisoned", self.name))?;
        Ok(guard.clone())
    }
}
