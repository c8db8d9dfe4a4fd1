use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::models::Retailer;
use crate::processor::ClusteringStrategy;

pub const DEFAULT_SIMILARITY: f64 = 0.8;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("similarity must be within (0, 1], got {0}")]
    SimilarityOutOfRange(f64),
    #[error("unit conversion table is empty")]
    EmptyUnitTable,
    #[error("conversion factor for unit '{0}' must be a positive number")]
    InvalidUnitFactor(String),
    #[error("unit names cannot be blank")]
    BlankUnit,
    #[error("source '{0}' appears more than once in the priority order")]
    DuplicateSource(String),
    #[error("fetch timeout must be at least one second")]
    ZeroFetchTimeout,
}

/// Everything the search engine reads from the outside world.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub normalizer: NormalizerConfig,
    pub quantity: QuantityConfig,
    pub clustering: ClusteringConfig,
    pub aggregator: AggregatorConfig,
    pub server: ServerConfig,
}

/// Filler vocabulary dropped from product names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub stop_words: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuantityConfig {
    /// Unit token -> factor into grams (or millilitres).
    pub units: HashMap<String, f64>,
    pub unknown_label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub similarity: f64,
    pub strategy: ClusteringStrategy,
    pub unknown_category: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Merge order of source results. Sources not listed come last.
    pub source_order: Vec<Retailer>,
    pub fetch_timeout_secs: u64,
    pub sources_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl CatalogConfig {
    /// Load the TOML file (optional) and apply `CATALOG__SECTION__KEY`
    /// environment overrides on top of the defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::new(path, ::config::FileFormat::Toml).required(false))
            .add_source(
                ::config::Environment::with_prefix("CATALOG")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("normalizer.stop_words")
                    .with_list_parse_key("aggregator.source_order"),
            )
            .build()
            .with_context(|| format!("Failed to read catalog config: {}", path))?;

        let config: CatalogConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse catalog config: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CatalogConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_similarity(self.clustering.similarity)?;

        if self.quantity.units.is_empty() {
            return Err(ConfigError::EmptyUnitTable);
        }
        for (unit, factor) in &self.quantity.units {
            if unit.trim().is_empty() {
                return Err(ConfigError::BlankUnit);
            }
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(ConfigError::InvalidUnitFactor(unit.clone()));
            }
        }

        if self.aggregator.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroFetchTimeout);
        }

        let mut seen = HashSet::new();
        for retailer in &self.aggregator.source_order {
            if !seen.insert(retailer) {
                return Err(ConfigError::DuplicateSource(retailer.to_string()));
            }
        }

        Ok(())
    }
}

pub fn validate_similarity(similarity: f64) -> Result<f64, ConfigError> {
    if similarity > 0.0 && similarity <= 1.0 {
        Ok(similarity)
    } else {
        Err(ConfigError::SimilarityOutOfRange(similarity))
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            stop_words: [
                "pacote",
                "com",
                "g",
                "kg",
                "gramas",
                "ml",
                "l",
                "unidade",
                "tradicional",
                "forma",
                "na chapa",
                "grãos",
            ]
            .iter()
            .map(|w| w.to_string())
            .collect(),
        }
    }
}

impl Default for QuantityConfig {
    fn default() -> Self {
        let units = [("g", 1.0), ("kg", 1000.0), ("ml", 1.0), ("l", 1000.0)]
            .iter()
            .map(|(unit, factor)| (unit.to_string(), *factor))
            .collect();

        Self {
            units,
            unknown_label: "Peso desconhecido".to_string(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            similarity: DEFAULT_SIMILARITY,
            strategy: ClusteringStrategy::default(),
            unknown_category: "Categoria desconhecida".to_string(),
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            source_order: Retailer::all().to_vec(),
            fetch_timeout_secs: 15,
            sources_dir: "src/configs/sources".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}
