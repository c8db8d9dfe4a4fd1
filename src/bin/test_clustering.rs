use anyhow::Result;
use catalog_pipeline::config::CatalogConfig;
use catalog_pipeline::models::{RawProductRecord, Retailer};
use catalog_pipeline::processor::{ClusteringEngine, ResultPresenter};
use std::env;

/// Clusters product names given on the command line, or a built-in sample,
/// without touching the network.
fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== CLUSTERING TEST ===\n");

    let config = CatalogConfig::load("src/configs/catalog.toml")?;
    let engine = ClusteringEngine::from_config(&config)?;
    println!(
        "Similarity cutoff: {} ({:?})\n",
        engine.similarity(),
        engine.strategy()
    );

    let names: Vec<String> = env::args().skip(1).collect();
    let records: Vec<RawProductRecord> = if names.is_empty() {
        sample()
    } else {
        names
            .into_iter()
            .map(|name| {
                let mut record = RawProductRecord::empty(Retailer::SamsClub);
                record.name = Some(name);
                record
            })
            .collect()
    };

    println!("Keys:");
    for record in &records {
        println!("  {:<40} -> {}", record.name_or_empty(), engine.canonical_key(record));
    }

    let groups = ResultPresenter::present(engine.cluster(records));
    println!("\n{} groups:", groups.len());
    for group in &groups {
        println!("\n[{}]", group.key);
        for record in &group.records {
            println!("  - {} ({})", record.name_or_empty(), record.source);
        }
    }

    Ok(())
}

fn sample() -> Vec<RawProductRecord> {
    [
        ("Arroz Tradicional 1kg", "Grãos", Retailer::SamsClub),
        ("arroz 1 kg", "Grãos", Retailer::Atacadao),
        ("Arroz Agulhinha Tipo 1 5kg", "Grãos", Retailer::Carrefour),
        ("Feijão Carioca 1kg", "Grãos", Retailer::Bretas),
        ("Feijao Carioca Pacote 1 kg", "Grãos", Retailer::SamsClub),
        ("Refrigerante Cola 2L", "Bebidas", Retailer::Carrefour),
        ("Refrigerante Cola 2 l", "Bebidas", Retailer::Bretas),
    ]
    .into_iter()
    .map(|(name, category, source)| {
        let mut record = RawProductRecord::empty(source);
        record.name = Some(name.to_string());
        record.category = Some(category.to_string());
        record
    })
    .collect()
}
