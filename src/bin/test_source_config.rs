use anyhow::Result;
use catalog_pipeline::config::SourceConfig;
use catalog_pipeline::fetcher::{HttpSource, ProductSource};
use catalog_pipeline::processor::RecordMapper;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== SOURCE CONFIG TEST ===\n");

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        println!("Usage: cargo run --bin test_source_config <config.toml> [term]");
        println!("Available configs live in src/configs/sources/");
        return Ok(());
    };

    let config = SourceConfig::from_file(path)?;
    println!("✅ Loaded config for: {}", config.source.id);
    println!("   Method: {}", config.request.method);
    println!("   Endpoint: {}", config.source.endpoint);
    println!("   Product path: {}", config.response.data_path);
    println!("   Enabled: {}", config.source.enabled);

    let Some(term) = args.get(2) else {
        if let Some(body) = config.build_request_body("arroz") {
            println!("\nRequest body for 'arroz':");
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        println!("\nPass a search term to run a live request.");
        return Ok(());
    };

    println!("\n=== Fetching '{}' ===", term);
    let source = HttpSource::new(config)?;
    let items = match source.fetch(term).await {
        Ok(items) => items,
        Err(e) => {
            println!("❌ Fetch failed: {:#}", e);
            return Ok(());
        }
    };
    println!("✅ Fetched {} products", items.len());

    let records = RecordMapper::new().map_all(source.id(), &items);
    for (i, record) in records.iter().take(10).enumerate() {
        println!(
            "{:2}. {} | {} | {}",
            i + 1,
            record.name_or_empty(),
            record
                .price
                .map(|p| format!("R$ {:.2}", p))
                .unwrap_or_else(|| "sem preço".to_string()),
            record.category.as_deref().unwrap_or("-")
        );
    }
    if records.len() > 10 {
        println!("   ... and {} more", records.len() - 10);
    }

    Ok(())
}
