//! Record source abstraction.
//!
//! The [`RecordSource`] trait is the fetch contract the derived-collection
//! view consumes: each call returns the full, ordered collection as it
//! currently exists upstream. Sources are constructed explicitly by the
//! host and passed in; there is no ambient client.
//!
//! Implementations must be `Send + Sync` so hosts can fetch the primary
//! and secondary collections concurrently.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RawRecord;

/// A re-fetchable, finite, ordered collection of records.
///
/// All operations are async (via `async-trait`). In-memory implementations
/// return immediately-ready futures.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Collection name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Fetch the whole collection. Every call returns a fresh snapshot.
    async fn fetch(&self) -> Result<Vec<RawRecord>>;
}
