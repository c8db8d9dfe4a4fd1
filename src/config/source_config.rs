use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::models::Retailer;

pub const TERM_PLACEHOLDER: &str = "{term}";

/// Configuration for one retailer search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source: SourceSection,
    pub request: RequestConfig,
    pub response: ResponseConfig,
    pub fields: FieldPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    pub id: Retailer,
    pub endpoint: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Query parameter carrying the term on GET requests.
    pub search_param: Option<String>,
    /// JSON body for POST requests; every `{term}` inside strings is replaced.
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseConfig {
    /// Dotted path to the product array, e.g. `data.search.products.edges`.
    pub data_path: String,
}

/// Dotted paths from a product node to each record field.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldPaths {
    pub name: String,
    pub price: Option<String>,
    pub ean: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl SourceConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source config file: {}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse source config file: {}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SourceConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load every enabled `*.toml` file in `dir`, sorted by file name.
    pub fn load_dir(dir: &str) -> Result<Vec<Self>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list source configs in {}", dir))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("toml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut configs = Vec::new();
        for path in paths {
            let config = Self::from_file(&path.to_string_lossy())?;
            if config.source.enabled {
                info!("Loaded source config for {} from {}", config.source.id, path.display());
                configs.push(config);
            } else {
                warn!("Source {} is disabled in {}", config.source.id, path.display());
            }
        }

        Ok(configs)
    }

    pub fn is_post(&self) -> bool {
        self.request.method.eq_ignore_ascii_case("POST")
    }

    pub fn build_request_body(&self, term: &str) -> Option<Value> {
        self.request
            .body
            .as_ref()
            .map(|body| substitute_term(body, term))
    }
}

fn substitute_term(value: &Value, term: &str) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace(TERM_PLACEHOLDER, term)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute_term(v, term)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_term(v, term)))
                .collect(),
        ),
        other => other.clone(),
    }
}
