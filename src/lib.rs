//! MCP server that exposes embeddable HTML widgets as tools and resources.
//!
//! Each connecting client gets its own protocol-server instance bound to a
//! server-sent-events stream; out-of-band JSON-RPC messages are posted back
//! over HTTP with the session id minted at connect time. The widget catalog
//! is loaded once at startup and shared read-only across all sessions.
//!
//! # Example
//!
//! ```no_run
//! use pizzaz_widget_mcp::{
//!     config::ServerConfig,
//!     http::{self, AppState, SessionRegistry},
//!     widgets::WidgetCatalog,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!
//!     // Fails fast if any widget asset is missing.
//!     let catalog = Arc::new(WidgetCatalog::load(&config.assets_dir)?);
//!
//!     let state = Arc::new(AppState {
//!         registry: Arc::new(SessionRegistry::new()),
//!         catalog,
//!         config: config.clone(),
//!     });
//!
//!     let listener = tokio::net::TcpListener::bind(config.addr()?).await?;
//!     axum::serve(listener, http::router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod server;
pub mod widgets;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{McpError, Result};
pub use http::{AppState, SessionRecord, SessionRegistry};
pub use protocol::{McpServer, McpServerBuilder, SseServerTransport};
pub use server::{WidgetHandler, create_session_server};
pub use widgets::WidgetCatalog;
