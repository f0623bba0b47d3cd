//! Per-session protocol server construction.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::protocol::{McpServer, McpServerBuilder};
use crate::server::handler::WidgetHandler;
use crate::widgets::WidgetCatalog;
use std::sync::Arc;

/// Build one fresh protocol-server instance for a new session.
///
/// Every session gets its own instance; the only shared state the bindings
/// capture is the read-only widget catalog, so concurrent construction needs
/// no synchronization.
pub fn create_session_server(
    catalog: Arc<WidgetCatalog>,
    config: &ServerConfig,
) -> Result<McpServer<WidgetHandler>> {
    let handler = WidgetHandler::new(catalog, config);

    McpServerBuilder::new()
        .handler(handler)
        .name(config.name.to_string())
        .version(config.version.to_string())
        .with_tools()
        .with_resources()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Widget;

    fn test_catalog() -> Arc<WidgetCatalog> {
        Arc::new(
            WidgetCatalog::from_widgets(vec![Widget {
                id: "pizza-list".into(),
                title: "Show Pizza List".into(),
                template_uri: "ui://widget/pizza-list.html".into(),
                invoking: "Hand-tossing a list".into(),
                invoked: "Served a fresh list".into(),
                html: "<div></div>".into(),
                response_text: "Rendered a pizza list!".into(),
            }])
            .unwrap(),
        )
    }

    #[test]
    fn test_factory_declares_both_capability_groups() {
        let server = create_session_server(test_catalog(), &ServerConfig::default()).unwrap();
        assert!(server.capabilities().tools.is_some());
        assert!(server.capabilities().resources.is_some());
    }

    #[tokio::test]
    async fn test_factory_builds_independent_instances() {
        let catalog = test_catalog();
        let config = ServerConfig::default();

        let first = create_session_server(Arc::clone(&catalog), &config).unwrap();
        let second = create_session_server(catalog, &config).unwrap();

        // Lifecycle state is per instance, never shared across sessions.
        first.stop();
        assert!(!first.is_running());
        assert_eq!(second.state().await, crate::protocol::ServerState::Created);
        assert_eq!(first.info().name, second.info().name);
    }
}
