use anyhow::{Context, Result, anyhow};
use catalog_pipeline::SearchPipeline;
use catalog_pipeline::config::CatalogConfig;
use catalog_pipeline::server;
use std::env;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "src/configs/catalog.toml";

struct Args {
    config_path: String,
    query: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: DEFAULT_CONFIG_PATH.to_string(),
        query: None,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                args.config_path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config expects a path"))?;
            }
            "--query" | "-q" => {
                args.query = Some(iter.next().ok_or_else(|| anyhow!("--query expects a term"))?);
            }
            "--help" | "-h" => {
                println!("Usage: catalog-pipeline [--config PATH] [--query TERM]");
                std::process::exit(0);
            }
            other => return Err(anyhow!("Unknown argument: {}", other)),
        }
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    dotenv::dotenv().ok();

    let args = parse_args()?;

    let config = CatalogConfig::load(&args.config_path)
        .context("Failed to load catalog configuration")?;
    info!(
        "Loaded catalog configuration from {} (similarity {}, strategy {:?})",
        args.config_path, config.clustering.similarity, config.clustering.strategy
    );

    let pipeline = SearchPipeline::from_config(&config)?;

    match args.query {
        Some(term) => {
            info!("🚀 Running one-off search for '{}'", term);
            let groups = pipeline.search(&term, None).await?;
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
        None => {
            server::serve(pipeline, &config.server.bind).await?;
        }
    }

    Ok(())
}
