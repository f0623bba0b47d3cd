//! Per-session MCP server with lifecycle management.

use crate::error::{McpError, ProtocolError, Result};
use crate::protocol::handler::{Dispatcher, Handler};
use crate::protocol::transport::Transport;
use crate::protocol::types::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Server state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Server created but not initialized.
    Created,
    /// Initialize request received, awaiting initialized notification.
    Initializing,
    /// Server is fully operational.
    Running,
    /// Server has stopped.
    Stopped,
}

/// MCP Server bound to exactly one session.
pub struct McpServer<H: Handler> {
    info: ServerInfo,
    capabilities: ServerCapabilities,
    handler: Arc<H>,
    state: Arc<RwLock<ServerState>>,
    running: AtomicBool,
}

impl<H: Handler + 'static> McpServer<H> {
    /// Create a new MCP server.
    pub fn new(handler: H, info: ServerInfo, capabilities: ServerCapabilities) -> Self {
        Self {
            info,
            capabilities,
            handler: Arc::new(handler),
            state: Arc::new(RwLock::new(ServerState::Created)),
            running: AtomicBool::new(false),
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// Get current server state.
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// Check if the read loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind this server to a transport.
    ///
    /// Performs the transport handshake, then spawns the read/dispatch/write
    /// loop. Fails without side effects on the transport if the handshake
    /// cannot complete.
    pub async fn connect<T: Transport + 'static>(self: &Arc<Self>, transport: Arc<T>) -> Result<()> {
        transport.start().await?;
        self.running.store(true, Ordering::SeqCst);

        info!(
            "MCP server {} v{} bound to session {}",
            self.info.name,
            self.info.version,
            transport.session_id()
        );

        let server = Arc::clone(self);
        tokio::spawn(async move {
            server.serve_loop(transport).await;
        });

        Ok(())
    }

    async fn serve_loop<T: Transport>(self: Arc<Self>, transport: Arc<T>) {
        let dispatcher = Dispatcher::new(Arc::clone(&self.handler));

        loop {
            if !self.running.load(Ordering::SeqCst) {
                debug!("Server stopping");
                break;
            }

            let message = match transport.read_message().await {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    debug!("Transport closed, ending session loop");
                    break;
                }
                Err(McpError::Protocol(ProtocolError::ParseError)) => {
                    let response = JsonRpcResponse::error(None, JsonRpcError::parse_error());
                    if let Err(e) = transport.write_response(&response).await {
                        error!("Failed to send error response: {}", e);
                    }
                    continue;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    break;
                }
            };

            match message {
                Message::Request(request) => {
                    let is_notification = request.is_notification();
                    let method = request.method.clone();

                    self.update_state_for_method(&method).await;

                    let response = dispatcher.dispatch(request).await;

                    // Notifications get no response frame.
                    if !is_notification && let Err(e) = transport.write_response(&response).await {
                        error!("Failed to send response: {}", e);
                    }
                }
                Message::Response(response) => {
                    // We don't expect responses in server mode, but log them.
                    warn!("Unexpected response received: {:?}", response.id);
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        *self.state.write().await = ServerState::Stopped;
        debug!("Session loop stopped");
    }

    /// Update server state based on the method being processed.
    async fn update_state_for_method(&self, method: &str) {
        let mut state = self.state.write().await;
        match method {
            "initialize" => {
                if *state == ServerState::Created {
                    *state = ServerState::Initializing;
                }
            }
            "initialized" | "notifications/initialized" => {
                if *state == ServerState::Initializing {
                    *state = ServerState::Running;
                    info!("Session initialized and running");
                }
            }
            _ => {}
        }
    }

    /// Stop the read loop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Builder for MCP Server.
pub struct McpServerBuilder<H: Handler> {
    handler: Option<H>,
    name: String,
    version: String,
    capabilities: ServerCapabilities,
}

impl<H: Handler + 'static> McpServerBuilder<H> {
    pub fn new() -> Self {
        Self {
            handler: None,
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
            capabilities: ServerCapabilities::default(),
        }
    }

    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_tools(mut self) -> Self {
        self.capabilities.tools = Some(ToolsCapability {
            list_changed: Some(false),
        });
        self
    }

    pub fn with_resources(mut self) -> Self {
        self.capabilities.resources = Some(ResourcesCapability {
            subscribe: Some(false),
            list_changed: Some(false),
        });
        self
    }

    pub fn build(self) -> Result<McpServer<H>> {
        let handler = self.handler.ok_or_else(|| McpError::Internal {
            message: "Handler is required".into(),
        })?;

        Ok(McpServer::new(
            handler,
            ServerInfo {
                name: self.name,
                version: self.version,
            },
            self.capabilities,
        ))
    }
}

impl<H: Handler + 'static> Default for McpServerBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolResult;
    use crate::protocol::transport::{MESSAGE_EVENT, SseServerTransport};
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::time::Duration;

    struct TestHandler;

    #[async_trait]
    impl Handler for TestHandler {
        async fn initialize(&self, _params: InitializeParams) -> ProtocolResult<InitializeResult> {
            Ok(InitializeResult {
                protocol_version: MCP_VERSION.into(),
                capabilities: ServerCapabilities::default(),
                server_info: ServerInfo {
                    name: "test".into(),
                    version: "1.0".into(),
                },
                instructions: None,
            })
        }

        async fn initialized(&self) -> ProtocolResult<()> {
            Ok(())
        }

        async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
            Ok(ListToolsResult {
                tools: vec![],
                next_cursor: None,
            })
        }

        async fn call_tool(&self, _params: CallToolParams) -> ProtocolResult<CallToolResult> {
            Ok(CallToolResult::text("test"))
        }

        async fn list_resources(&self) -> ProtocolResult<ListResourcesResult> {
            Ok(ListResourcesResult {
                resources: vec![],
                next_cursor: None,
            })
        }

        async fn read_resource(
            &self,
            params: ReadResourceParams,
        ) -> ProtocolResult<ReadResourceResult> {
            Err(crate::error::ProtocolError::ResourceNotFound(params.uri))
        }

        async fn list_resource_templates(&self) -> ProtocolResult<ListResourceTemplatesResult> {
            Ok(ListResourceTemplatesResult {
                resource_templates: vec![],
                next_cursor: None,
            })
        }
    }

    #[test]
    fn test_server_builder() {
        let server = McpServerBuilder::new()
            .handler(TestHandler)
            .name("test-server")
            .version("0.1.0")
            .with_tools()
            .with_resources()
            .build()
            .unwrap();

        assert_eq!(server.info().name, "test-server");
        assert_eq!(server.info().version, "0.1.0");
        assert!(server.capabilities().tools.is_some());
        assert!(server.capabilities().resources.is_some());
    }

    #[tokio::test]
    async fn test_server_state() {
        let server = McpServerBuilder::new()
            .handler(TestHandler)
            .build()
            .unwrap();

        assert_eq!(server.state().await, ServerState::Created);
    }

    #[tokio::test]
    async fn test_connect_answers_posted_requests_over_stream() {
        let server = Arc::new(
            McpServerBuilder::new()
                .handler(TestHandler)
                .with_tools()
                .build()
                .unwrap(),
        );
        let (transport, mut stream) = SseServerTransport::new("/mcp/messages");

        server.connect(Arc::clone(&transport)).await.unwrap();

        // Handshake frame first.
        let endpoint = stream.next().await.unwrap();
        assert_eq!(endpoint.event, "endpoint");

        let body = serde_json::to_vec(&JsonRpcRequest::new("tools/list").with_id(1)).unwrap();
        transport.handle_post_message(&body).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event, MESSAGE_EVENT);
        let response: JsonRpcResponse = serde_json::from_str(&event.data).unwrap();
        assert!(response.result.is_some());
    }

    #[tokio::test]
    async fn test_connect_fails_when_stream_already_gone() {
        let server = Arc::new(
            McpServerBuilder::new()
                .handler(TestHandler)
                .build()
                .unwrap(),
        );
        let (transport, stream) = SseServerTransport::new("/mcp/messages");
        drop(stream);

        assert!(server.connect(transport).await.is_err());
    }
}
