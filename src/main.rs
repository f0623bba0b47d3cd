//! Widget MCP server binary entry point.

use anyhow::Result;
use pizzaz_widget_mcp::{
    config::ServerConfig,
    http::{self, AppState, SessionRegistry},
    widgets::WidgetCatalog,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = ServerConfig::builder().from_env()?.build()?;

    // Startup is fatal if any widget asset is missing; a session must never
    // observe a partially-loaded catalog.
    let catalog = Arc::new(WidgetCatalog::load(&config.assets_dir)?);
    info!(
        "Loaded {} widgets from {}",
        catalog.widgets().len(),
        config.assets_dir.display()
    );

    let addr = config.addr()?;
    let state = Arc::new(AppState {
        registry: Arc::new(SessionRegistry::new()),
        catalog,
        config,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    info!(
        "SSE endpoint: {}  message endpoint: {}",
        state.config.sse_path, state.config.post_path
    );

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pizzaz_widget_mcp=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
