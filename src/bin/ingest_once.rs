//! Run a single ingestion tick against the configured store and print the summary.
//! Run with: cargo run --bin ingest-once

use std::sync::Arc;

use posts_ingest_service::config::Config;
use posts_ingest_service::services::HttpPostSource;
use posts_ingest_service::{db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "posts_ingest_service=info".into()),
        )
        .init();

    let config = Config::load()?;
    let store = db::connect(&config).await?;
    let source = Arc::new(HttpPostSource::new(&config.source)?);
    let state = AppState::new(config, store, source)?;

    let summary = state.fetcher.run_once().await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(error) = summary.error {
        anyhow::bail!("Ingestion tick failed: {}", error);
    }

    Ok(())
}
