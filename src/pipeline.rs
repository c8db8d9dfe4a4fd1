use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::{CatalogConfig, SourceConfig};
use crate::fetcher::{HttpSource, ProductSource, SourceAggregator};
use crate::processor::{ClusteringEngine, GroupView, ResultPresenter};

/// One search request end to end: fetch from every source, cluster, present.
pub struct SearchPipeline {
    aggregator: SourceAggregator,
    engine: ClusteringEngine,
}

impl SearchPipeline {
    pub fn new(sources: Vec<Arc<dyn ProductSource>>, config: &CatalogConfig) -> Result<Self> {
        let engine =
            ClusteringEngine::from_config(config).context("Failed to build clustering engine")?;
        let aggregator = SourceAggregator::new(sources, &config.aggregator);

        Ok(SearchPipeline { aggregator, engine })
    }

    /// Builds an `HttpSource` for every enabled file in `sources_dir`.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let mut sources: Vec<Arc<dyn ProductSource>> = Vec::new();
        for source_config in SourceConfig::load_dir(&config.aggregator.sources_dir)? {
            let id = source_config.source.id;
            let source = HttpSource::new(source_config)
                .with_context(|| format!("Failed to create HTTP client for {}", id))?;
            sources.push(Arc::new(source));
        }

        info!("Search pipeline ready with {} sources", sources.len());
        Self::new(sources, config)
    }

    pub fn engine(&self) -> &ClusteringEngine {
        &self.engine
    }

    /// `similarity` overrides the configured cutoff for this search only.
    pub async fn search(&self, term: &str, similarity: Option<f64>) -> Result<Vec<GroupView>> {
        let request_id = Uuid::new_v4();
        let span = info_span!("search", %request_id, term);

        async move {
            let records = self.aggregator.aggregate(term).await;
            let record_count = records.len();

            let groups = match similarity {
                Some(cutoff) => self.engine.cluster_with_similarity(records, cutoff)?,
                None => self.engine.cluster(records),
            };

            info!("Search returned {} records in {} groups", record_count, groups.len());
            Ok::<_, anyhow::Error>(ResultPresenter::present(groups))
        }
        .instrument(span)
        .await
    }
}
