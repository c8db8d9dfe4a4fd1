use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::{CatalogConfig, ConfigError, validate_similarity};
use crate::models::{CanonicalKey, ProductGroup, ProductGroups, RawProductRecord};
use crate::processor::similarity::{SequenceMatcher, closest_match};
use crate::processor::{QuantityExtractor, TextNormalizer};

/// How records are merged once their keys are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusteringStrategy {
    /// Single pass in input order. Each record is compared only with the key
    /// that opened each existing group and joins the best one at or above the
    /// cutoff, or opens a new group. Groups never merge afterwards, so the
    /// result depends on input order.
    #[default]
    GreedyOnline,
    /// Every pair of keys at or above the cutoff is linked and groups are the
    /// connected components. Order-independent membership, quadratic cost.
    TransitiveClosure,
}

pub struct ClusteringEngine {
    normalizer: TextNormalizer,
    extractor: QuantityExtractor,
    similarity: f64,
    strategy: ClusteringStrategy,
    unknown_category: String,
    unknown_quantity: String,
}

impl ClusteringEngine {
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let similarity = validate_similarity(config.clustering.similarity)?;

        Ok(ClusteringEngine {
            normalizer: TextNormalizer::new(&config.normalizer)?,
            extractor: QuantityExtractor::new(&config.quantity)?,
            similarity,
            strategy: config.clustering.strategy,
            unknown_category: config.clustering.unknown_category.clone(),
            unknown_quantity: config.quantity.unknown_label.clone(),
        })
    }

    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    pub fn strategy(&self) -> ClusteringStrategy {
        self.strategy
    }

    /// `{normalized_name}_{category}_{quantity}g`
    pub fn canonical_key(&self, record: &RawProductRecord) -> CanonicalKey {
        let name = record.name_or_empty();
        let normalized = self.normalizer.normalize(name);
        let quantity = self.extractor.extract(name).render(&self.unknown_quantity);
        let category = record
            .category
            .as_deref()
            .unwrap_or(self.unknown_category.as_str());

        CanonicalKey::compose(&normalized, category, &quantity)
    }

    pub fn cluster(&self, records: Vec<RawProductRecord>) -> ProductGroups {
        self.cluster_records(records, self.similarity)
    }

    /// Cluster with a cutoff other than the configured one.
    pub fn cluster_with_similarity(
        &self,
        records: Vec<RawProductRecord>,
        similarity: f64,
    ) -> Result<ProductGroups, ConfigError> {
        let similarity = validate_similarity(similarity)?;
        Ok(self.cluster_records(records, similarity))
    }

    fn cluster_records(&self, records: Vec<RawProductRecord>, cutoff: f64) -> ProductGroups {
        let record_count = records.len();
        let groups = match self.strategy {
            ClusteringStrategy::GreedyOnline => self.cluster_greedy(records, cutoff),
            ClusteringStrategy::TransitiveClosure => self.cluster_transitive(records, cutoff),
        };

        info!(
            "Clustered {} records into {} groups ({:?}, cutoff {})",
            record_count,
            groups.len(),
            self.strategy,
            cutoff
        );

        groups
    }

    fn cluster_greedy(&self, records: Vec<RawProductRecord>, cutoff: f64) -> ProductGroups {
        let mut groups: ProductGroups = Vec::new();

        for record in records {
            let key = self.canonical_key(&record);
            let representatives = groups.iter().map(|group| group.key.as_str());

            match closest_match(key.as_str(), representatives, cutoff) {
                Some((index, score)) => {
                    debug!("'{}' joins '{}' (score {:.3})", key, groups[index].key, score);
                    groups[index].records.push(record);
                }
                None => {
                    debug!("'{}' opens a new group", key);
                    groups.push(ProductGroup {
                        key,
                        records: vec![record],
                    });
                }
            }
        }

        groups
    }

    fn cluster_transitive(&self, records: Vec<RawProductRecord>, cutoff: f64) -> ProductGroups {
        let keys: Vec<CanonicalKey> = records.iter().map(|r| self.canonical_key(r)).collect();
        let mut parents: Vec<usize> = (0..keys.len()).collect();

        for later in 1..keys.len() {
            let matcher = SequenceMatcher::new(keys[later].as_str());
            for earlier in 0..later {
                if matcher.ratio_at_least(keys[earlier].as_str(), cutoff).is_some() {
                    union(&mut parents, earlier, later);
                }
            }
        }

        // Roots are the smallest index of their component, so groups come out
        // in order of their first member.
        let mut slots: HashMap<usize, usize> = HashMap::new();
        let mut groups: ProductGroups = Vec::new();
        for (index, (record, key)) in records.into_iter().zip(keys).enumerate() {
            let root = find(&mut parents, index);
            match slots.get(&root) {
                Some(&slot) => groups[slot].records.push(record),
                None => {
                    slots.insert(root, groups.len());
                    groups.push(ProductGroup {
                        key,
                        records: vec![record],
                    });
                }
            }
        }

        groups
    }
}

fn find(parents: &mut [usize], mut node: usize) -> usize {
    let mut root = node;
    while parents[root] != root {
        root = parents[root];
    }
    while parents[node] != root {
        let next = parents[node];
        parents[node] = root;
        node = next;
    }
    root
}

fn union(parents: &mut [usize], a: usize, b: usize) {
    let root_a = find(parents, a);
    let root_b = find(parents, b);
    if root_a != root_b {
        let (low, high) = (root_a.min(root_b), root_a.max(root_b));
        parents[high] = low;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Retailer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn record(name: &str, category: Option<&str>, source: Retailer) -> RawProductRecord {
        RawProductRecord {
            name: Some(name.to_string()),
            price: Some(10.0),
            ean: None,
            brand: None,
            image_url: None,
            category: category.map(|c| c.to_string()),
            source,
        }
    }

    fn engine() -> ClusteringEngine {
        ClusteringEngine::from_config(&CatalogConfig::default()).unwrap()
    }

    fn transitive_engine() -> ClusteringEngine {
        let mut config = CatalogConfig::default();
        config.clustering.strategy = ClusteringStrategy::TransitiveClosure;
        ClusteringEngine::from_config(&config).unwrap()
    }

    fn membership(groups: &ProductGroups) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|g| g.records.iter().map(|r| r.name_or_empty().to_string()).collect())
            .collect()
    }

    #[test]
    fn test_canonical_key() {
        let e = engine();

        let key = e.canonical_key(&record("Arroz Tradicional 1kg", Some("Grãos"), Retailer::SamsClub));
        assert_eq!(key.as_str(), "arroz_grãos_1000.0g");

        let key = e.canonical_key(&record("Sal Refinado", None, Retailer::Bretas));
        assert_eq!(key.as_str(), "sal refinado_categoria desconhecida_Peso desconhecidog");

        let key = e.canonical_key(&RawProductRecord::empty(Retailer::Carrefour));
        assert_eq!(key.as_str(), "_categoria desconhecida_Peso desconhecidog");
    }

    #[test]
    fn test_same_product_across_sources_merges() {
        let records = vec![
            record("Arroz Tradicional 1kg", Some("Grãos"), Retailer::SamsClub),
            record("arroz 1 kg", Some("Grãos"), Retailer::Atacadao),
        ];

        let groups = engine().cluster(records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].records.len(), 2);
        assert_eq!(groups[0].key.as_str(), "arroz_grãos_1000.0g");
        assert_eq!(groups[0].records[1].source, Retailer::Atacadao);
    }

    #[test]
    fn test_category_splits_groups() {
        let records = vec![
            record("Arroz Tradicional 1kg", Some("Grãos"), Retailer::SamsClub),
            record("arroz 1 kg", Some("Bebidas"), Retailer::Atacadao),
        ];

        let groups = engine().cluster(records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].key.as_str(), "arroz_bebidas_1000.0g");
    }

    #[test]
    fn test_quantity_splits_groups() {
        let records = vec![
            record("Feijão Carioca 1kg", Some("Mercearia"), Retailer::SamsClub),
            record("Feijão Carioca 2kg", Some("Mercearia"), Retailer::Bretas),
        ];

        // The keys differ in one character, so only a strict cutoff separates them
        let groups = engine().cluster_with_similarity(records.clone(), 1.0).unwrap();
        assert_eq!(groups.len(), 2);

        let groups = engine().cluster(records);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_bare_records_group_together() {
        let records = vec![
            RawProductRecord::empty(Retailer::SamsClub),
            record("!!!", None, Retailer::Atacadao),
            record("", None, Retailer::Carrefour),
        ];

        let groups = engine().cluster(records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].records.len(), 3);
    }

    #[test]
    fn test_records_keep_insertion_order() {
        let records = vec![
            record("Café 500g", Some("Mercearia"), Retailer::SamsClub),
            record("Detergente Líquido 500ml", Some("Limpeza"), Retailer::SamsClub),
            record("Cafe 500 g", Some("Mercearia"), Retailer::Carrefour),
            record("Café Pacote 500g", Some("Mercearia"), Retailer::Bretas),
        ];

        let groups = engine().cluster(records);
        assert_eq!(
            membership(&groups),
            vec![
                vec!["Café 500g", "Cafe 500 g", "Café Pacote 500g"],
                vec!["Detergente Líquido 500ml"],
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let records = vec![
            record("Leite Integral 1L", Some("Laticínios"), Retailer::SamsClub),
            record("Leite Desnatado 1L", Some("Laticínios"), Retailer::Atacadao),
            record("Leite Integral 1 L", Some("Laticínios"), Retailer::Carrefour),
            record("Iogurte 170g", Some("Laticínios"), Retailer::Bretas),
        ];

        let first = engine().cluster(records.clone());
        let second = engine().cluster(records);
        assert_eq!(first, second);
    }

    fn strict_engine(strategy: ClusteringStrategy) -> ClusteringEngine {
        let mut config = CatalogConfig::default();
        config.clustering.similarity = 0.9;
        config.clustering.strategy = strategy;
        ClusteringEngine::from_config(&config).unwrap()
    }

    // b sits between a and c: a~b and b~c clear 0.9, a~c doesn't.
    fn chain() -> (RawProductRecord, RawProductRecord, RawProductRecord) {
        (
            record("abcdefgh", Some("x"), Retailer::SamsClub),
            record("abcdefxy", Some("x"), Retailer::Atacadao),
            record("abcdwxyz", Some("x"), Retailer::Carrefour),
        )
    }

    #[test]
    fn test_greedy_tolerates_order_sensitivity() {
        let (a, b, c) = chain();
        let e = strict_engine(ClusteringStrategy::GreedyOnline);

        let a_first = e.cluster(vec![a.clone(), c.clone(), b.clone()]);
        let b_first = e.cluster(vec![b, a, c]);

        // Both are valid greedy outputs; they are not expected to agree.
        assert_eq!(
            membership(&a_first),
            vec![vec!["abcdefgh", "abcdefxy"], vec!["abcdwxyz"]]
        );
        assert_eq!(
            membership(&b_first),
            vec![vec!["abcdefxy", "abcdefgh", "abcdwxyz"]]
        );
    }

    #[test]
    fn test_shuffled_input_keeps_every_record() {
        let mut records = vec![
            record("Arroz 5kg", Some("Mercearia"), Retailer::SamsClub),
            record("Arroz Tipo 1 5kg", Some("Mercearia"), Retailer::Atacadao),
            record("Arroz Integral 1kg", Some("Mercearia"), Retailer::Carrefour),
            record("Arroz Parboilizado 5kg", Some("Mercearia"), Retailer::Bretas),
            record("Feijão Preto 1kg", Some("Mercearia"), Retailer::Bretas),
            record("Refrigerante 2L", Some("Bebidas"), Retailer::SamsClub),
        ];
        let e = engine();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..10 {
            records.shuffle(&mut rng);
            let groups = e.cluster(records.clone());

            let total: usize = groups.iter().map(|g| g.records.len()).sum();
            assert_eq!(total, records.len());

            // Whatever the order, each member cleared the cutoff against the
            // key that opened its group.
            for group in &groups {
                for member in &group.records {
                    let key = e.canonical_key(member);
                    assert!(SequenceMatcher::new(key.as_str())
                        .ratio_at_least(group.key.as_str(), e.similarity())
                        .is_some());
                }
            }
        }
    }

    #[test]
    fn test_transitive_closure_is_order_independent() {
        let (a, b, c) = chain();
        let e = strict_engine(ClusteringStrategy::TransitiveClosure);

        let first = e.cluster(vec![a.clone(), c.clone(), b.clone()]);
        let second = e.cluster(vec![b, a, c]);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].key.as_str(), "abcdefgh_x_Peso desconhecidog");
        assert_eq!(second[0].key.as_str(), "abcdefxy_x_Peso desconhecidog");
    }

    #[test]
    fn test_transitive_groups_follow_first_member() {
        let records = vec![
            record("Óleo de Soja 900ml", Some("Mercearia"), Retailer::SamsClub),
            record("Arroz 5kg", Some("Mercearia"), Retailer::Atacadao),
            record("Oleo de Soja 900 ml", Some("Mercearia"), Retailer::Bretas),
        ];

        let groups = transitive_engine().cluster(records);
        assert_eq!(
            membership(&groups),
            vec![
                vec!["Óleo de Soja 900ml", "Oleo de Soja 900 ml"],
                vec!["Arroz 5kg"],
            ]
        );
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert_eq!(
            engine().cluster_with_similarity(vec![], 0.0),
            Err(ConfigError::SimilarityOutOfRange(0.0))
        );
        assert!(engine().cluster_with_similarity(vec![], 1.01).is_err());
    }
}
