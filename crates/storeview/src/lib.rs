//! # Storeview
//!
//! **Derived-collection views over remote storefront records.**
//!
//! Storeview fetches record collections (carts, products, orders, reviews,
//! expenses) from a REST backend or local JSON files, joins them, filters
//! them by free text and date range, paginates, and aggregates them into
//! dashboard counts and totals. Results are served by a CLI (`sv`) and a
//! JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────────────┐
//! │ RecordSource │──▶│     storeview-core      │
//! │ HTTP / File  │   │ join ▸ filter ▸ paginate│
//! └──────────────┘   │ summarize ▸ total       │
//!                    └────────────┬────────────┘
//!                      ┌──────────┴──────────┐
//!                      ▼                     ▼
//!                 ┌──────────┐         ┌──────────┐
//!                 │   CLI    │         │   HTTP   │
//!                 │  (sv)    │         │  (axum)  │
//!                 └──────────┘         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sv views                                        # list configured views
//! sv view incomplete-orders --search lamp --page 2
//! sv summary orders --by status
//! sv totals incomplete-orders --since 2024-03-01
//! sv serve                                        # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`sources`] | HTTP and file record sources, response-shape handling |
//! | [`views`] | View resolution, concurrent fetch, query validation, CLI output |
//! | [`summary`] | Class counts and numeric totals over filtered records |
//! | [`server`] | JSON HTTP API (Axum) with CORS |
//! | [`logging`] | `tracing` subscriber setup |

pub mod config;
pub mod logging;
pub mod server;
pub mod sources;
pub mod summary;
pub mod views;

pub use storeview_core as core;
pub use storeview_core::{DerivedRecord, RawRecord};
