use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::models::Retailer;

/// A retailer that can be searched for products.
///
/// Records come back loosely typed; field names and presence vary per
/// retailer and are reconciled by `RecordMapper`.
#[async_trait]
pub trait ProductSource: Send + Sync {
    fn id(&self) -> Retailer;

    async fn fetch(&self, term: &str) -> Result<Vec<Value>>;
}
