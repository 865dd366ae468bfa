//! Dashboard aggregations over a view's filtered records.
//!
//! Summaries count records per class label (order status, join outcome);
//! totals sum an amount field (order totals, expenses, cart value). Both
//! run over the full filtered set, ignoring pagination, and delegate to
//! `storeview-core::summary`.

use anyhow::Result;
use serde::Deserialize;

use storeview_core::summary::{
    compute_summary, compute_totals, FieldClassifier, JoinClassifier, Summary, Totals,
};

use crate::config::Config;
use crate::sources::SourceProvider;
use crate::views::{load_view, LoadedView, ViewError, ViewQuery};

/// Query for `sv summary` and `POST /views/{name}/summary`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(flatten)]
    pub query: ViewQuery,
    /// Field to classify by; defaults to the view's `status_field`.
    #[serde(default)]
    pub by: Option<String>,
    /// Classify by join outcome (`matched` / `unmatched`) instead of a field.
    #[serde(default)]
    pub by_join: bool,
}

/// Query for `sv totals` and `POST /views/{name}/totals`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TotalsQuery {
    #[serde(flatten)]
    pub query: ViewQuery,
    /// Amount field; defaults to the view's `amount_field`.
    #[serde(default)]
    pub field: Option<String>,
    /// Quantity multiplier; defaults to the view's `quantity_field`.
    #[serde(default)]
    pub quantity: Option<String>,
}

pub fn summarize(loaded: &LoadedView, query: &SummaryQuery) -> Result<Summary, ViewError> {
    let params = loaded.params(&query.query)?;
    let records = loaded.filtered(&params);

    if query.by_join {
        if query.by.is_some() {
            return Err(ViewError::InvalidQuery(
                "by and by_join are mutually exclusive".to_string(),
            ));
        }
        if loaded.spec.join.is_none() {
            return Err(ViewError::InvalidQuery(format!(
                "view '{}' has no join to classify by",
                loaded.name
            )));
        }
        return Ok(compute_summary(&records, &JoinClassifier));
    }

    let field = query
        .by
        .as_deref()
        .or(loaded.config.status_field.as_deref())
        .ok_or_else(|| {
            ViewError::InvalidQuery(format!(
                "view '{}' has no status_field; pass a field to classify by",
                loaded.name
            ))
        })?;
    Ok(compute_summary(&records, &FieldClassifier::new(field)))
}

pub fn total(loaded: &LoadedView, query: &TotalsQuery) -> Result<Totals, ViewError> {
    let params = loaded.params(&query.query)?;
    let records = loaded.filtered(&params);

    let field = query
        .field
        .as_deref()
        .or(loaded.config.amount_field.as_deref())
        .ok_or_else(|| {
            ViewError::InvalidQuery(format!(
                "view '{}' has no amount_field; pass a field to total",
                loaded.name
            ))
        })?;
    let quantity = query
        .quantity
        .as_deref()
        .or(loaded.config.quantity_field.as_deref());

    Ok(compute_totals(&records, field, quantity))
}

/// CLI entry point for `sv summary <name>`.
pub async fn run_summary(config: &Config, name: &str, query: SummaryQuery, json: bool) -> Result<()> {
    let provider = SourceProvider::new(config)?;
    let loaded = load_view(config, &provider, name).await?;
    let summary = summarize(&loaded, &query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}: {} records", name, summary.total);
    println!();
    println!("  {:<24} {:>8}", "CLASS", "COUNT");
    println!("  {}", "-".repeat(33));
    for (label, count) in &summary.buckets {
        println!("  {:<24} {:>8}", label, count);
    }
    println!("  {:<24} {:>8}", storeview_core::summary::UNCLASSIFIED, summary.unclassified);
    Ok(())
}

/// CLI entry point for `sv totals <name>`.
pub async fn run_totals(config: &Config, name: &str, query: TotalsQuery, json: bool) -> Result<()> {
    let provider = SourceProvider::new(config)?;
    let loaded = load_view(config, &provider, name).await?;
    let totals = total(&loaded, &query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    println!("total:   {:.2}", totals.total);
    println!("counted: {}", totals.counted);
    println!("missing: {}", totals.missing);
    Ok(())
}
