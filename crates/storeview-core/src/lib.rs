//! # Storeview Core
//!
//! Pure derived-collection logic for Storeview: record models, the
//! primary/secondary join, search and date filtering, pagination, and
//! summary aggregation, plus the [`source::RecordSource`] abstraction that
//! fetch layers implement.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! runtime-bound dependencies. Every computation is a synchronous function
//! of its arguments; the caller decides when to refetch and recompute.
//!
//! ## Pipeline
//!
//! ```text
//! primary ──┐
//!           ├─▶ join ─▶ filter (search, date range) ─▶ paginate ─▶ ViewResult
//! secondary ┘                     │
//!                                 └─▶ summarize / total ─▶ Summary, Totals
//! ```

pub mod filter;
pub mod join;
pub mod models;
pub mod page;
pub mod source;
pub mod summary;
pub mod view;

pub use models::{DerivedRecord, RawRecord};
pub use view::{compute_view, QueryParams, ViewResult, ViewSpec};
