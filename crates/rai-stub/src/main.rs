//! Standalone development server for the compliance API.
//!
//! Serves the built-in sample catalog unless `RAI_STUB_CATALOG` names a
//! directory of decision-tree files.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rai_catalog::StandardsCatalog;
use rai_stub::{router, sample_catalog, AppState, MemoryBackend, StubConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("RAI_STUB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8095);

    let config = StubConfig::from_env();
    let catalog = match &config.catalog_dir {
        Some(dir) => StandardsCatalog::load_dir(dir)
            .with_context(|| format!("loading catalog from {}", dir.display()))?,
        None => sample_catalog(),
    };
    let app = router(MemoryBackend::new(AppState::with_config(catalog, config)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("rai-stub listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}
