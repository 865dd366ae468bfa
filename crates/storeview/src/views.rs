//! Configured views: fetch their collections and compute pages.
//!
//! This module is the application-level entry point for views. The join,
//! filter, and pagination logic lives in `storeview-core::view`; this
//! wrapper resolves a view from config, fetches its primary and secondary
//! collections concurrently, validates query input, and formats CLI output.
//!
//! Every call refetches. Nothing is cached between invocations, so a
//! mutation made through the REST API shows up on the next request.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use storeview_core::filter::{DateRange, FieldSearch};
use storeview_core::join::JoinSpec;
use storeview_core::models::{search_text, DerivedRecord, RawRecord};
use storeview_core::source::RecordSource;
use storeview_core::view::{compute_view, derive_records, QueryParams, ViewResult, ViewSpec};

use crate::config::{Config, ViewConfig};
use crate::sources::SourceProvider;

/// Client-side mistakes when addressing or querying a view.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("view not found: {0}")]
    NotFound(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Raw query input as it arrives from the CLI or an HTTP body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub search: Option<String>,
    /// Inclusive start date, `YYYY-MM-DD`.
    #[serde(default)]
    pub since: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD`.
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

fn parse_day(value: Option<&str>, label: &str) -> Result<Option<NaiveDate>, ViewError> {
    match value {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ViewError::InvalidQuery(format!("{} must be YYYY-MM-DD, got '{}'", label, s))),
    }
}

/// Summary of a configured view, as listed by `sv views` and `GET /views`.
#[derive(Debug, Clone, Serialize)]
pub struct ViewDescriptor {
    pub name: String,
    pub primary: String,
    pub secondary: Option<String>,
    pub join_key: Option<String>,
    pub search_fields: Vec<String>,
    pub date_field: Option<String>,
    pub page_size: usize,
}

pub fn list_views(config: &Config) -> Vec<ViewDescriptor> {
    config
        .views
        .iter()
        .map(|(name, view)| ViewDescriptor {
            name: name.clone(),
            primary: view.primary.clone(),
            secondary: view.secondary.clone(),
            join_key: view.join_key.clone(),
            search_fields: view.search_fields.clone(),
            date_field: view.date_field.clone(),
            page_size: config.page_size_for(view),
        })
        .collect()
}

/// Build the core view spec for a configured view.
pub fn view_spec(view: &ViewConfig) -> ViewSpec {
    let mut spec = ViewSpec::new(FieldSearch::new(view.search_fields.iter().cloned()));
    if let Some(join_key) = &view.join_key {
        spec = spec.with_join(JoinSpec::new(join_key.clone()).with_match_field(view.match_field.clone()));
    }
    if let Some(date_field) = &view.date_field {
        spec = spec.with_date_field(date_field.clone());
    }
    spec
}

/// A view with its collections fetched, ready to compute.
pub struct LoadedView {
    pub name: String,
    pub config: ViewConfig,
    pub spec: ViewSpec,
    pub page_size: usize,
    pub primary: Vec<RawRecord>,
    pub secondary: Option<Vec<RawRecord>>,
}

impl LoadedView {
    /// Validate raw query input against this view.
    pub fn params(&self, query: &ViewQuery) -> Result<QueryParams, ViewError> {
        let start = parse_day(query.since.as_deref(), "since")?;
        let end = parse_day(query.until.as_deref(), "until")?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ViewError::InvalidQuery(format!(
                    "since ({}) is after until ({})",
                    s, e
                )));
            }
        }

        let range = DateRange::new(start, end);
        if !range.is_unbounded() && self.spec.date_field.is_none() {
            return Err(ViewError::InvalidQuery(format!(
                "view '{}' has no date_field; --since/--until are not supported",
                self.name
            )));
        }

        if query.page_size == Some(0) {
            return Err(ViewError::InvalidQuery("page_size must be >= 1".to_string()));
        }

        Ok(QueryParams {
            search: query.search.clone().unwrap_or_default(),
            date_range: (!range.is_unbounded()).then_some(range),
            page: query.page.unwrap_or(1),
            page_size: query.page_size.unwrap_or(self.page_size),
        })
    }

    pub fn compute(&self, params: &QueryParams) -> ViewResult<'_> {
        compute_view(&self.primary, self.secondary.as_deref(), &self.spec, params)
    }

    /// All records passing the filters, unpaginated.
    pub fn filtered(&self, params: &QueryParams) -> Vec<DerivedRecord<'_>> {
        derive_records(&self.primary, self.secondary.as_deref(), &self.spec, params)
    }
}

async fn fetch_optional(source: Option<&dyn RecordSource>) -> Result<Option<Vec<RawRecord>>> {
    match source {
        Some(source) => Ok(Some(source.fetch().await?)),
        None => Ok(None),
    }
}

/// Resolve view `name` and fetch its collections concurrently.
pub async fn load_view(config: &Config, provider: &SourceProvider, name: &str) -> Result<LoadedView> {
    let view = config
        .views
        .get(name)
        .ok_or_else(|| ViewError::NotFound(name.to_string()))?;

    let primary_source = provider.source(&view.primary)?;
    let secondary_source = match &view.secondary {
        Some(secondary) => Some(provider.source(secondary)?),
        None => None,
    };

    let (primary, secondary) = tokio::join!(
        primary_source.fetch(),
        fetch_optional(secondary_source.as_deref())
    );
    let primary = primary.with_context(|| format!("Failed to fetch collection '{}'", view.primary))?;
    let secondary = secondary.with_context(|| {
        format!(
            "Failed to fetch collection '{}'",
            view.secondary.as_deref().unwrap_or_default()
        )
    })?;

    debug!(
        view = name,
        primary = primary.len(),
        secondary = ?secondary.as_ref().map(Vec::len),
        "loaded view"
    );

    Ok(LoadedView {
        name: name.to_string(),
        config: view.clone(),
        spec: view_spec(view),
        page_size: config.page_size_for(view),
        primary,
        secondary,
    })
}

/// Render a field value on one line for CLI output.
pub fn display_value(value: &Value) -> String {
    search_text(value).unwrap_or_else(|| value.to_string())
}

/// CLI entry point for `sv view <name>`.
pub async fn run_view(config: &Config, name: &str, query: ViewQuery, json: bool) -> Result<()> {
    let provider = SourceProvider::new(config)?;
    let loaded = load_view(config, &provider, name).await?;
    let params = loaded.params(&query)?;
    let result = loaded.compute(&params);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.total_items == 0 {
        println!("No records.");
        return Ok(());
    }

    println!(
        "{}: page {} of {} ({} records, {} per page)",
        name, result.current_page, result.total_pages, result.total_items, result.page_size
    );
    println!();

    let offset = (result.current_page - 1) * result.page_size;
    for (i, item) in result.page_items.iter().enumerate() {
        let id = item
            .record
            .id(&loaded.config.id_field)
            .unwrap_or_else(|| "(no id)".to_string());
        println!("{}. {}", offset + i + 1, id);

        for field in &loaded.config.search_fields {
            if let Some(value) = item.get(field) {
                println!("    {}: {}", field, display_value(value));
            }
        }
        if let Some(date_field) = &loaded.config.date_field {
            if let Some(value) = item.get(date_field) {
                println!("    {}: {}", date_field, display_value(value));
            }
        }
        if loaded.spec.join.is_some() {
            match item.joined {
                Some(joined) => println!(
                    "    joined: {}",
                    joined
                        .id(&loaded.config.match_field)
                        .unwrap_or_else(|| "(no id)".to_string())
                ),
                None => println!("    joined: (no match)"),
            }
        }
        println!();
    }

    Ok(())
}

/// CLI entry point for `sv views`.
pub fn run_list_views(config: &Config) -> Result<()> {
    let views = list_views(config);
    if views.is_empty() {
        println!("No views configured.");
        return Ok(());
    }

    println!("{:<24} {:<16} {:<16} JOIN", "VIEW", "PRIMARY", "SECONDARY");
    for v in &views {
        println!(
            "{:<24} {:<16} {:<16} {}",
            v.name,
            v.primary,
            v.secondary.as_deref().unwrap_or("-"),
            v.join_key.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionConfig, DefaultsConfig};
    use serde_json::json;

    fn write_json(dir: &std::path::Path, name: &str, value: Value) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
        path
    }

    fn file_collection(path: std::path::PathBuf) -> CollectionConfig {
        CollectionConfig {
            path: None,
            file: Some(path),
            records_key: None,
        }
    }

    fn cart_config(dir: &std::path::Path) -> Config {
        let carts = write_json(
            dir,
            "carts.json",
            json!([
                {"_id": "c1", "productId": "p1", "email": "ana@shop.test", "createdAt": "2024-02-01"},
                {"_id": "c2", "productId": "p1", "email": "bo@shop.test", "createdAt": "2024-03-10"},
                {"_id": "c3", "productId": "p9", "email": "cy@shop.test", "createdAt": "2024-03-20"}
            ]),
        );
        let products = write_json(dir, "products.json", json!({"data": [{"_id": "p1", "title": "Lamp"}]}));

        let mut config = Config {
            defaults: DefaultsConfig { page_size: 2 },
            ..Config::default()
        };
        config.collections.insert("carts".into(), file_collection(carts));
        let mut products = file_collection(products);
        products.records_key = Some("data".into());
        config.collections.insert("products".into(), products);
        config.views.insert(
            "incomplete-orders".into(),
            ViewConfig {
                primary: "carts".into(),
                secondary: Some("products".into()),
                join_key: Some("productId".into()),
                match_field: "_id".into(),
                id_field: "_id".into(),
                search_fields: vec!["email".into(), "joined.title".into()],
                date_field: Some("createdAt".into()),
                status_field: None,
                amount_field: None,
                quantity_field: None,
                page_size: None,
            },
        );
        config
    }

    #[tokio::test]
    async fn test_load_and_compute() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = cart_config(dir.path());
        let provider = SourceProvider::new(&config).unwrap();
        let loaded = load_view(&config, &provider, "incomplete-orders").await.unwrap();

        let params = loaded.params(&ViewQuery::default()).unwrap();
        let result = loaded.compute(&params);
        assert_eq!(result.total_items, 3);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.page_items.len(), 2);

        let lamp = loaded
            .params(&ViewQuery {
                search: Some("lamp".into()),
                ..ViewQuery::default()
            })
            .unwrap();
        assert_eq!(loaded.filtered(&lamp).len(), 2);
    }

    #[tokio::test]
    async fn test_date_window() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = cart_config(dir.path());
        let provider = SourceProvider::new(&config).unwrap();
        let loaded = load_view(&config, &provider, "incomplete-orders").await.unwrap();

        let params = loaded
            .params(&ViewQuery {
                since: Some("2024-03-01".into()),
                until: Some("2024-03-10".into()),
                ..ViewQuery::default()
            })
            .unwrap();
        let filtered = loaded.filtered(&params);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].record.id("_id").as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_unknown_view_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = cart_config(dir.path());
        let provider = SourceProvider::new(&config).unwrap();
        let err = load_view(&config, &provider, "nope").await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ViewError>(),
            Some(ViewError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_query_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = cart_config(dir.path());
        let provider = SourceProvider::new(&config).unwrap();
        let loaded = load_view(&config, &provider, "incomplete-orders").await.unwrap();

        let bad_date = ViewQuery {
            since: Some("03/01/2024".into()),
            ..ViewQuery::default()
        };
        assert!(matches!(loaded.params(&bad_date), Err(ViewError::InvalidQuery(_))));

        let reversed = ViewQuery {
            since: Some("2024-04-01".into()),
            until: Some("2024-03-01".into()),
            ..ViewQuery::default()
        };
        assert!(matches!(loaded.params(&reversed), Err(ViewError::InvalidQuery(_))));

        let zero = ViewQuery {
            page_size: Some(0),
            ..ViewQuery::default()
        };
        assert!(matches!(loaded.params(&zero), Err(ViewError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_missing_secondary_file_fails_fetch() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = cart_config(dir.path());
        config.collections.insert(
            "products".into(),
            file_collection(dir.path().join("gone.json")),
        );
        let provider = SourceProvider::new(&config).unwrap();
        let err = load_view(&config, &provider, "incomplete-orders").await.err().unwrap();
        assert!(format!("{:#}", err).contains("products"));
    }

    #[test]
    fn test_list_views_uses_default_page_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = cart_config(dir.path());
        let views = list_views(&config);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].page_size, 2);
        assert_eq!(views[0].join_key.as_deref(), Some("productId"));
    }
}
