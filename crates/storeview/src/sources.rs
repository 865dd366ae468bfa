//! Record sources backed by the REST API or local JSON files.
//!
//! [`SourceProvider`] is built once from [`Config`] and owns the shared
//! HTTP client; it hands out a [`RecordSource`] per configured collection.
//! Hosts thread the provider through explicitly rather than reaching for a
//! global client.
//!
//! # Response shapes
//!
//! | Body | Records |
//! |------|---------|
//! | `[{..}, {..}]` | the array |
//! | `{"data": [{..}]}` with `records_key = "data"` | the keyed array |
//! | `{"orders": [{..}], "count": 2}` without `records_key` | the first array-valued field |
//!
//! Array elements that are not JSON objects are skipped with a warning.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use storeview_core::models::RawRecord;
use storeview_core::source::RecordSource;

use crate::config::{CollectionConfig, Config};

/// Failures of the fetch layer, kept typed so the server can map them.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("collection not configured: {0}")]
    UnknownCollection(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("collection '{collection}' has an unexpected body: {reason}")]
    Shape { collection: String, reason: String },
}

/// Pull the record array out of a response body.
pub fn extract_records(
    collection: &str,
    body: Value,
    records_key: Option<&str>,
) -> Result<Vec<RawRecord>, FetchError> {
    let items = match (body, records_key) {
        (Value::Array(items), _) => items,
        (Value::Object(mut fields), Some(key)) => match fields.remove(key) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(FetchError::Shape {
                    collection: collection.to_string(),
                    reason: format!("field '{}' is not an array", key),
                })
            }
            None => {
                return Err(FetchError::Shape {
                    collection: collection.to_string(),
                    reason: format!("field '{}' is missing", key),
                })
            }
        },
        (Value::Object(fields), None) => fields
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .ok_or_else(|| FetchError::Shape {
                collection: collection.to_string(),
                reason: "object body has no array field".to_string(),
            })?,
        (other, _) => {
            return Err(FetchError::Shape {
                collection: collection.to_string(),
                reason: format!("expected array or object, got {}", json_kind(&other)),
            })
        }
    };

    let total = items.len();
    let records: Vec<RawRecord> = items.into_iter().filter_map(RawRecord::from_value).collect();
    if records.len() < total {
        warn!(
            collection,
            skipped = total - records.len(),
            "skipping non-object entries"
        );
    }
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A collection served by the REST API.
pub struct HttpSource {
    name: String,
    url: String,
    records_key: Option<String>,
    token: Option<String>,
    client: reqwest::Client,
}

#[async_trait]
impl RecordSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        debug!(collection = %self.name, url = %self.url, "fetching collection");

        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| FetchError::Request {
            url: self.url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body: Value = response.json().await.map_err(|source| FetchError::Request {
            url: self.url.clone(),
            source,
        })?;

        let records = extract_records(&self.name, body, self.records_key.as_deref())?;
        debug!(collection = %self.name, count = records.len(), "fetched collection");
        Ok(records)
    }
}

/// A collection stored as a local JSON file.
pub struct FileSource {
    name: String,
    path: PathBuf,
    records_key: Option<String>,
}

impl FileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, records_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            records_key,
        }
    }
}

#[async_trait]
impl RecordSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        debug!(collection = %self.name, path = %self.path.display(), "reading collection");

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read collection file: {}", self.path.display()))?;
        let body: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse collection file: {}", self.path.display()))?;

        Ok(extract_records(&self.name, body, self.records_key.as_deref())?)
    }
}

/// Builds record sources for configured collections.
#[derive(Clone)]
pub struct SourceProvider {
    config: Config,
    client: reqwest::Client,
    token: Option<String>,
}

impl SourceProvider {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let token = match &config.api.token_env {
            Some(var) => match std::env::var(var) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(var = %var, "api.token_env is set but the variable is not");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            config: config.clone(),
            client,
            token,
        })
    }

    /// Source for the collection named `name`.
    pub fn source(&self, name: &str) -> Result<Box<dyn RecordSource>> {
        let collection = self
            .config
            .collections
            .get(name)
            .ok_or_else(|| FetchError::UnknownCollection(name.to_string()))?;
        self.build(name, collection)
    }

    fn build(&self, name: &str, collection: &CollectionConfig) -> Result<Box<dyn RecordSource>> {
        if let Some(file) = &collection.file {
            return Ok(Box::new(FileSource::new(
                name,
                file.clone(),
                collection.records_key.clone(),
            )));
        }

        let path = collection
            .path
            .as_deref()
            .with_context(|| format!("collections.{} has neither path nor file", name))?;
        let base = self
            .config
            .api
            .base_url
            .as_deref()
            .context("api.base_url is not set")?;

        Ok(Box::new(HttpSource {
            name: name.to_string(),
            url: join_url(base, path),
            records_key: collection.records_key.clone(),
            token: self.token.clone(),
            client: self.client.clone(),
        }))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
