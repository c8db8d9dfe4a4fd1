use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::config::AggregatorConfig;
use crate::fetcher::ProductSource;
use crate::models::{RawProductRecord, Retailer};
use crate::processor::RecordMapper;

/// Queries every source for one term and merges the results.
pub struct SourceAggregator {
    sources: Vec<Arc<dyn ProductSource>>,
    mapper: RecordMapper,
    timeout: Duration,
}

impl SourceAggregator {
    /// Sources are ranked by `source_order`; unlisted ones keep their
    /// relative order after the listed ones.
    pub fn new(mut sources: Vec<Arc<dyn ProductSource>>, config: &AggregatorConfig) -> Self {
        let rank = |id: Retailer| {
            config
                .source_order
                .iter()
                .position(|r| *r == id)
                .unwrap_or(usize::MAX)
        };
        sources.sort_by_key(|source| rank(source.id()));

        SourceAggregator {
            sources,
            mapper: RecordMapper::new(),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    pub fn source_ids(&self) -> Vec<Retailer> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Fetches run concurrently, but records are always concatenated in
    /// priority order. A source that errors, times out or panics contributes
    /// nothing and never affects the others.
    pub async fn aggregate(&self, term: &str) -> Vec<RawProductRecord> {
        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let term = term.to_string();
                let timeout = self.timeout;
                tokio::spawn(async move { tokio::time::timeout(timeout, source.fetch(&term)).await })
            })
            .collect();

        let _guard = AbortOnDrop(handles.iter().map(|h| h.abort_handle()).collect());
        let outcomes = join_all(handles).await;

        let mut records = Vec::new();
        let mut successful_sources = 0;

        for (source, outcome) in self.sources.iter().zip(outcomes) {
            let id = source.id();
            match outcome {
                Ok(Ok(Ok(items))) => {
                    info!("✅ {} returned {} products", id, items.len());
                    records.extend(self.mapper.map_all(id, &items));
                    successful_sources += 1;
                }
                Ok(Ok(Err(e))) => {
                    error!("❌ Failed to fetch from {}: {:#}", id, e);
                }
                Ok(Err(_)) => {
                    warn!("⚠️ {} did not answer within {:?}", id, self.timeout);
                }
                Err(e) => {
                    error!("❌ Fetch task for {} aborted: {}", id, e);
                }
            }
        }

        info!(
            "Aggregated {} records from {} of {} sources",
            records.len(),
            successful_sources,
            self.sources.len()
        );

        records
    }
}

/// Aborts the spawned fetches if `aggregate` is dropped before they finish.
/// Aborting a finished task is a no-op.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}
