//! Error types for the widget MCP server.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the widget MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Widget error: {0}")]
    Widget(#[from] WidgetError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

/// JSON-RPC 2.0 and MCP protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: invalid JSON")]
    ParseError,

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("Internal error: {0}")]
    InternalError(Cow<'static, str>),

    #[error("Unknown resource: {0}")]
    ResourceNotFound(String),

    #[error("Transport error: {0}")]
    Transport(Cow<'static, str>),
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::InternalError(_) => -32603,
            Self::ResourceNotFound(_) => -32002,
            Self::Transport(_) => -32000,
        }
    }
}

/// Widget catalog and asset errors.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(
        "Widget assets not found. Expected directory {}. Build the web assets before starting the server.",
        .0.display()
    )]
    AssetsDirMissing(PathBuf),

    #[error(
        "Widget HTML for \"{name}\" not found in {}. Build the web assets to generate it.",
        dir.display()
    )]
    AssetNotFound { name: String, dir: PathBuf },

    #[error("Duplicate widget id: {0}")]
    DuplicateId(String),

    #[error("Duplicate template URI: {0}")]
    DuplicateUri(String),
}

impl From<WidgetError> for ProtocolError {
    /// Map catalog lookups and validation failures onto JSON-RPC error codes.
    fn from(error: WidgetError) -> Self {
        match error {
            WidgetError::UnknownResource(uri) => ProtocolError::ResourceNotFound(uri),
            WidgetError::UnknownTool(_) | WidgetError::InvalidArguments(_) => {
                ProtocolError::InvalidParams(error.to_string().into())
            }
            other => ProtocolError::InternalError(other.to_string().into()),
        }
    }
}

/// Session routing errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing sessionId query parameter")]
    MissingSessionId,

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Failed to establish SSE connection: {0}")]
    HandshakeFailed(String),

    #[error("Failed to process message: {0}")]
    Forwarding(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },
}

/// Result type alias for McpError.
pub type Result<T> = std::result::Result<T, McpError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Result type alias for WidgetError.
pub type WidgetResult<T> = std::result::Result<T, WidgetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_codes() {
        assert_eq!(ProtocolError::ParseError.code(), -32700);
        assert_eq!(ProtocolError::InvalidRequest("test".into()).code(), -32600);
        assert_eq!(ProtocolError::MethodNotFound("test".into()).code(), -32601);
        assert_eq!(ProtocolError::InvalidParams("test".into()).code(), -32602);
        assert_eq!(ProtocolError::InternalError("test".into()).code(), -32603);
        assert_eq!(ProtocolError::ResourceNotFound("test".into()).code(), -32002);
    }

    #[test]
    fn test_error_conversion() {
        let widget_error = WidgetError::UnknownTool("pizza-list".into());
        let mcp_error: McpError = widget_error.into();
        assert!(matches!(mcp_error, McpError::Widget(_)));
    }

    #[test]
    fn test_not_found_errors_name_the_identifier() {
        let err = WidgetError::UnknownResource("ui://widget/missing.html".into());
        assert!(err.to_string().contains("ui://widget/missing.html"));

        let err = SessionError::UnknownSession("abc-123".into());
        assert!(err.to_string().contains("abc-123"));
    }

    #[test]
    fn test_asset_errors_name_the_directory() {
        let err = WidgetError::AssetNotFound {
            name: "pizza-list".into(),
            dir: PathBuf::from("/srv/web/dist"),
        };
        let message = err.to_string();
        assert!(message.contains("pizza-list"));
        assert!(message.contains("/srv/web/dist"));
    }
}
