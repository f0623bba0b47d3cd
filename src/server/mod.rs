//! Widget MCP server implementation.

pub mod factory;
pub mod handler;

pub use factory::create_session_server;
pub use handler::WidgetHandler;
