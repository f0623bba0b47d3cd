//! MCP request handler backed by the widget catalog.

use crate::config::ServerConfig;
use crate::error::{ProtocolResult, WidgetError};
use crate::protocol::{
    CallToolParams, CallToolResult, Handler, InitializeParams, InitializeResult,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, MCP_VERSION,
    ReadResourceParams, ReadResourceResult, ResourceContents, ResourcesCapability,
    ServerCapabilities, ServerInfo, ToolsCapability,
};
use crate::widgets::{WIDGET_MIME_TYPE, WidgetCatalog, parse_tool_arguments, widget_meta};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Handler answering the four widget request kinds as pure reads over the
/// catalog. Safe to share across sessions: it holds no mutable state.
pub struct WidgetHandler {
    catalog: Arc<WidgetCatalog>,
    info: ServerInfo,
}

impl WidgetHandler {
    pub fn new(catalog: Arc<WidgetCatalog>, config: &ServerConfig) -> Self {
        Self {
            catalog,
            info: ServerInfo {
                name: config.name.to_string(),
                version: config.version.to_string(),
            },
        }
    }

    pub fn catalog(&self) -> &Arc<WidgetCatalog> {
        &self.catalog
    }
}

#[async_trait]
impl Handler for WidgetHandler {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
        info!(
            "Initialize request from {} v{}",
            params.client_info.name, params.client_info.version
        );

        let capabilities = ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
            resources: Some(ResourcesCapability {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
        };

        let tool_names: Vec<&str> = self
            .catalog
            .widgets()
            .iter()
            .map(|w| w.id.as_str())
            .collect();
        let instructions = format!(
            "Widget MCP server. Each tool renders a widget resource. Available tools: {}.",
            tool_names.join(", ")
        );

        Ok(InitializeResult {
            protocol_version: MCP_VERSION.into(),
            capabilities,
            server_info: self.info.clone(),
            instructions: Some(instructions),
        })
    }

    async fn initialized(&self) -> ProtocolResult<()> {
        info!("Session initialized");
        Ok(())
    }

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
        let tools = self.catalog.tools();
        debug!("Listing {} tools", tools.len());

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(&self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
        debug!("Tool call: {}", params.name);

        let widget = self
            .catalog
            .by_id(&params.name)
            .ok_or_else(|| WidgetError::UnknownTool(params.name.clone()))?;

        // Validation runs before any widget logic.
        let topping = parse_tool_arguments(&params.arguments)?;

        Ok(CallToolResult::text(widget.response_text.clone())
            .with_structured_content(json!({ "pizzaTopping": topping }))
            .with_meta(widget_meta(widget)))
    }

    async fn list_resources(&self) -> ProtocolResult<ListResourcesResult> {
        let resources = self.catalog.resources();
        debug!("Listing {} resources", resources.len());

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(&self, params: ReadResourceParams) -> ProtocolResult<ReadResourceResult> {
        debug!("Resource read: {}", params.uri);

        let widget = self
            .catalog
            .by_uri(&params.uri)
            .ok_or_else(|| WidgetError::UnknownResource(params.uri.clone()))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: widget.template_uri.clone(),
                mime_type: Some(WIDGET_MIME_TYPE.into()),
                text: Some(widget.html.clone()),
                meta: Some(widget_meta(widget)),
            }],
        })
    }

    async fn list_resource_templates(&self) -> ProtocolResult<ListResourceTemplatesResult> {
        // The catalog offers no parametric templates.
        Ok(ListResourceTemplatesResult {
            resource_templates: vec![],
            next_cursor: None,
        })
    }
}
