use serde::Serialize;

use crate::models::{ProductGroups, RawProductRecord};

/// One group as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    #[serde(rename = "chave")]
    pub key: String,
    #[serde(rename = "produtos")]
    pub records: Vec<RawProductRecord>,
}

pub struct ResultPresenter;

impl ResultPresenter {
    /// Flatten groups into `(key, records)` pairs, keeping both group
    /// creation order and record insertion order.
    pub fn present(groups: ProductGroups) -> Vec<GroupView> {
        groups
            .into_iter()
            .map(|group| GroupView {
                key: group.key.as_str().to_string(),
                records: group.records,
            })
            .collect()
    }
}
