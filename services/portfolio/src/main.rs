use anyhow::{Context, Result};
use portfolio_store::{CatalogState, Config, GallerySession};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        database = %config.store.database_path.display(),
        "Starting portfolio store"
    );

    let session = GallerySession::open(&config)
        .await
        .context("Failed to open gallery session")?;

    if let CatalogState::Ready { degraded: true } = session.catalog().state() {
        warn!("Blob store unavailable, only static entries are listed");
    }

    for entry in session.catalog().entries() {
        info!(
            id = %entry.id(),
            kind = %entry.kind(),
            title = %entry.title(),
            created_at = entry.created_at(),
            is_static = entry.is_static(),
            locator = %entry.locator,
            "Catalog entry"
        );
    }

    match session.stats().await {
        Ok(stats) => info!(
            total_entries = stats.total_entries,
            total_bytes = stats.total_bytes,
            "Blob store statistics"
        ),
        Err(e) => warn!(error = %e, "Failed to read blob store statistics"),
    }

    session.close().await;

    info!("Portfolio store stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}
