//! TOML configuration parsing and validation.
//!
//! A config file names the record collections (HTTP paths under one
//! `api.base_url`, or local JSON files) and the views built from them.
//! See [`load_config`] for the validation rules.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use storeview_core::models::DEFAULT_ID_FIELD;
use storeview_core::view::DEFAULT_PAGE_SIZE;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,
    #[serde(default)]
    pub views: BTreeMap<String, ViewConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL every HTTP collection path is resolved against.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of an environment variable holding a bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            token_env: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DefaultsConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Where a collection's records come from. Exactly one of `path` or `file`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CollectionConfig {
    /// HTTP path relative to `api.base_url` (e.g. `/api/carts`).
    #[serde(default)]
    pub path: Option<String>,
    /// Local JSON file holding the collection.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Key of the record array when the body is a wrapping object.
    #[serde(default)]
    pub records_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewConfig {
    pub primary: String,
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub join_key: Option<String>,
    #[serde(default = "default_id_field")]
    pub match_field: String,
    /// Identifier shown for each record in CLI output.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default)]
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub date_field: Option<String>,
    #[serde(default)]
    pub status_field: Option<String>,
    #[serde(default)]
    pub amount_field: Option<String>,
    #[serde(default)]
    pub quantity_field: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

impl Config {
    /// Page size for `view`, falling back to `[defaults].page_size`.
    pub fn page_size_for(&self, view: &ViewConfig) -> usize {
        view.page_size.unwrap_or(self.defaults.page_size)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    if let Some(dir) = path.parent() {
        resolve_files(&mut config, dir);
    }
    Ok(config)
}

/// Make relative `file` collections relative to the config file's directory.
fn resolve_files(config: &mut Config, dir: &Path) {
    for collection in config.collections.values_mut() {
        if let Some(file) = &mut collection.file {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }
    }
}

/// Check cross-references and value ranges.
pub fn validate(config: &Config) -> Result<()> {
    if config.api.timeout_secs == 0 {
        bail!("api.timeout_secs must be >= 1");
    }

    if config.defaults.page_size == 0 {
        bail!("defaults.page_size must be >= 1");
    }

    if let Some(base) = &config.api.base_url {
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            bail!("api.base_url must start with http:// or https://, got '{}'", base);
        }
    }

    for (name, collection) in &config.collections {
        match (&collection.path, &collection.file) {
            (Some(_), Some(_)) => {
                bail!("collections.{}: set either path or file, not both", name)
            }
            (None, None) => bail!("collections.{}: one of path or file is required", name),
            (Some(path), None) => {
                // One backend per config: collection paths may not name their own host.
                if path.contains("://") || !path.starts_with('/') {
                    bail!(
                        "collections.{}.path must be a relative path starting with '/', got '{}'",
                        name,
                        path
                    );
                }
                if config.api.base_url.is_none() {
                    bail!("collections.{} uses path but api.base_url is not set", name);
                }
            }
            (None, Some(_)) => {}
        }
    }

    for (name, view) in &config.views {
        if !config.collections.contains_key(&view.primary) {
            bail!(
                "views.{}.primary references unknown collection '{}'",
                name,
                view.primary
            );
        }
        match (&view.secondary, &view.join_key) {
            (Some(secondary), Some(_)) => {
                if !config.collections.contains_key(secondary) {
                    bail!(
                        "views.{}.secondary references unknown collection '{}'",
                        name,
                        secondary
                    );
                }
            }
            (Some(_), None) => bail!("views.{}: secondary requires join_key", name),
            (None, Some(_)) => bail!("views.{}: join_key requires secondary", name),
            (None, None) => {}
        }
        if view.page_size == Some(0) {
            bail!("views.{}.page_size must be >= 1", name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    const BASE: &str = r#"
[api]
base_url = "https://api.shop.test"

[collections.carts]
path = "/api/carts"
records_key = "data"

[collections.products]
file = "products.json"

[views.incomplete-orders]
primary = "carts"
secondary = "products"
join_key = "productId"
search_fields = ["email", "joined.title"]
date_field = "createdAt"
"#;

    #[test]
    fn test_defaults_applied() {
        let cfg = parse(BASE).unwrap();
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.server.bind, "127.0.0.1:7341");
        assert_eq!(cfg.defaults.page_size, 20);
        let view = &cfg.views["incomplete-orders"];
        assert_eq!(view.match_field, "_id");
        assert_eq!(cfg.page_size_for(view), 20);
    }

    #[test]
    fn test_view_page_size_override() {
        let cfg = parse(&format!("{BASE}page_size = 5\n")).unwrap();
        assert_eq!(cfg.page_size_for(&cfg.views["incomplete-orders"]), 5);
    }

    #[test]
    fn test_absolute_collection_url_rejected() {
        let src = BASE.replace("/api/carts", "http://localhost:5000/api/carts");
        let err = parse(&src).unwrap_err().to_string();
        assert!(err.contains("relative path"), "{err}");
    }

    #[test]
    fn test_path_requires_base_url() {
        let src = BASE.replace("base_url = \"https://api.shop.test\"", "");
        let err = parse(&src).unwrap_err().to_string();
        assert!(err.contains("api.base_url"), "{err}");
    }

    #[test]
    fn test_collection_needs_exactly_one_origin() {
        let both = format!("{BASE}\n[collections.x]\npath = \"/x\"\nfile = \"x.json\"\n");
        assert!(parse(&both).is_err());
        let neither = format!("{BASE}\n[collections.y]\nrecords_key = \"data\"\n");
        assert!(parse(&neither).is_err());
    }

    #[test]
    fn test_unknown_collection_reference() {
        let src = BASE.replace("secondary = \"products\"", "secondary = \"nope\"");
        let err = parse(&src).unwrap_err().to_string();
        assert!(err.contains("unknown collection 'nope'"), "{err}");
    }

    #[test]
    fn test_secondary_and_join_key_go_together() {
        let src = BASE.replace("join_key = \"productId\"\n", "");
        assert!(parse(&src).is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let src = format!("[defaults]\npage_size = 0\n{BASE}");
        assert!(parse(&src).is_err());
    }

    #[test]
    fn test_load_config_resolves_files_against_config_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sv.toml");
        std::fs::write(
            &path,
            r#"
[collections.expenses]
file = "data/expenses.json"

[collections.archive]
file = "/srv/archive.json"
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(
            cfg.collections["expenses"].file.as_deref(),
            Some(tmp.path().join("data/expenses.json").as_path())
        );
        assert_eq!(
            cfg.collections["archive"].file.as_deref(),
            Some(Path::new("/srv/archive.json"))
        );
    }
}
