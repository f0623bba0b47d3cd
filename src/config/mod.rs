//! Configuration types and builders.

use crate::error::{ConfigError, McpError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default SSE connection path.
pub const DEFAULT_SSE_PATH: &str = "/mcp";

/// Default out-of-band message path.
pub const DEFAULT_POST_PATH: &str = "/mcp/messages";

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub host: String,
    pub port: u16,
    /// Directory the widget HTML assets are loaded from at startup.
    pub assets_dir: PathBuf,
    /// Path a client opens the streaming connection on.
    pub sse_path: String,
    /// Path a client posts session-scoped messages to.
    pub post_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "pizzaz-widget-mcp".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            host: "0.0.0.0".into(),
            port: 8000,
            assets_dir: PathBuf::from("web/dist"),
            sse_path: DEFAULT_SSE_PATH.into(),
            post_path: DEFAULT_POST_PATH.into(),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Socket address the HTTP listener binds to.
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            McpError::Config(ConfigError::InvalidValue {
                field: "host".into(),
                message: format!("'{}:{}' is not a valid socket address", self.host, self.port)
                    .into(),
            })
        })
    }
}

/// Builder for ServerConfig with fluent API.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.assets_dir = dir.into();
        self
    }

    pub fn sse_path(mut self, path: impl Into<String>) -> Self {
        self.config.sse_path = path.into();
        self
    }

    pub fn post_path(mut self, path: impl Into<String>) -> Self {
        self.config.post_path = path.into();
        self
    }

    /// Build from environment variables.
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(port) = env::var("PORT") {
            self.config.port = port.parse().map_err(|_| {
                McpError::Config(ConfigError::InvalidValue {
                    field: "PORT".into(),
                    message: "Invalid port number".into(),
                })
            })?;
        }

        if let Ok(host) = env::var("PIZZAZ_HOST") {
            self.config.host = host;
        }

        if let Ok(dir) = env::var("PIZZAZ_ASSETS_DIR") {
            self.config.assets_dir = PathBuf::from(dir);
        }

        Ok(self)
    }

    pub fn build(self) -> Result<ServerConfig> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<()> {
        if self.config.host.is_empty() {
            return Err(ConfigError::MissingField("host".into()).into());
        }
        if !self.config.sse_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "sse_path".into(),
                message: "Path must start with '/'".into(),
            }
            .into());
        }
        if !self.config.post_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "post_path".into(),
                message: "Path must start with '/'".into(),
            }
            .into());
        }
        if self.config.sse_path == self.config.post_path {
            return Err(ConfigError::InvalidValue {
                field: "post_path".into(),
                message: "SSE and message paths must differ".into(),
            }
            .into());
        }
        Ok(())
    }
}
