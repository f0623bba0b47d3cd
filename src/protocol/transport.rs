//! SSE transport for per-session JSON-RPC framing.
//!
//! Each streaming connection gets one `SseServerTransport`. Responses travel
//! to the client as SSE `message` events; client requests arrive out-of-band
//! via `handle_post_message`. The transport owns the session id and exposes
//! `onclose`/`onerror` observer slots that must be wired before relying on
//! them.

use crate::error::{McpError, ProtocolError, Result};
use crate::protocol::types::{JsonRpcResponse, Message};
use async_trait::async_trait;
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

/// SSE event name for the handshake frame carrying the message-post endpoint.
pub const ENDPOINT_EVENT: &str = "endpoint";

/// SSE event name for JSON-RPC response frames.
pub const MESSAGE_EVENT: &str = "message";

const CHANNEL_CAPACITY: usize = 256;

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Session id assigned at construction, unique among live sessions.
    fn session_id(&self) -> &str;

    /// Perform the transport handshake. Must be called exactly once.
    async fn start(&self) -> Result<()>;

    /// Read the next inbound message; `None` means the transport closed.
    async fn read_message(&self) -> Result<Option<Message>>;

    /// Write one response frame to the client.
    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()>;

    /// Tear the transport down. Idempotent.
    fn close(&self);
}

type CloseCallback = Box<dyn FnOnce() + Send>;
type ErrorCallback = Box<dyn Fn(&McpError) + Send + Sync>;

/// One frame of the outbound SSE stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: &'static str,
    pub data: String,
}

/// Server side of one SSE session.
pub struct SseServerTransport {
    session_id: String,
    endpoint: String,
    outbound: mpsc::Sender<SseEvent>,
    inbound_tx: Mutex<Option<mpsc::Sender<Message>>>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<Message>>,
    started: AtomicBool,
    closed: AtomicBool,
    onclose: Mutex<Option<CloseCallback>>,
    onerror: Mutex<Option<ErrorCallback>>,
}

impl SseServerTransport {
    /// Create a transport and the SSE stream feeding the HTTP response body.
    ///
    /// The transport generates its own session id; dropping the returned
    /// stream (client disconnect) fires `onclose` exactly once.
    pub fn new(post_path: &str) -> (Arc<Self>, SseStream) {
        let session_id = Uuid::new_v4().to_string();
        let endpoint = format!("{}?sessionId={}", post_path, session_id);

        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let transport = Arc::new(Self {
            session_id,
            endpoint,
            outbound: outbound_tx,
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            onclose: Mutex::new(None),
            onerror: Mutex::new(None),
        });

        let stream = SseStream {
            rx: outbound_rx,
            transport: Arc::clone(&transport),
        };

        (transport, stream)
    }

    /// Register the close observer. Replaces any previous callback.
    pub fn set_onclose(&self, callback: impl FnOnce() + Send + 'static) {
        *self.onclose.lock() = Some(Box::new(callback));
    }

    /// Register the error observer. Replaces any previous callback.
    pub fn set_onerror(&self, callback: impl Fn(&McpError) + Send + Sync + 'static) {
        *self.onerror.lock() = Some(Box::new(callback));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Accept one out-of-band message posted for this session.
    pub async fn handle_post_message(&self, body: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(ProtocolError::Transport("session transport is closed".into()).into());
        }

        let message: Message =
            serde_json::from_slice(body).map_err(|_| ProtocolError::ParseError)?;
        trace!("Inbound message for session {}", self.session_id);

        let tx = self
            .inbound_tx
            .lock()
            .clone()
            .ok_or_else(|| ProtocolError::Transport("session transport is closed".into()))?;

        tx.send(message).await.map_err(|_| {
            McpError::from(ProtocolError::Transport("session read loop has stopped".into()))
        })
    }

    /// Report a transport-level error to the observer, if wired.
    pub fn report_error(&self, error: &McpError) {
        if let Some(callback) = &*self.onerror.lock() {
            callback(error);
        }
    }

    /// Mark the transport closed and fire `onclose` once.
    fn notify_closed(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!("Transport closed for session {}", self.session_id);
        // Dropping the inbound sender ends the server read loop.
        self.inbound_tx.lock().take();

        let callback = self.onclose.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

#[async_trait]
impl Transport for SseServerTransport {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ProtocolError::Transport("transport already started".into()).into());
        }

        // The first frame tells the client where to post session messages.
        self.outbound
            .send(SseEvent {
                event: ENDPOINT_EVENT,
                data: self.endpoint.clone(),
            })
            .await
            .map_err(|_| {
                McpError::from(ProtocolError::Transport(
                    "SSE stream closed before handshake".into(),
                ))
            })
    }

    async fn read_message(&self) -> Result<Option<Message>> {
        let mut rx = self.inbound_rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()> {
        let data = serde_json::to_string(response)?;
        debug!("Sending response: id={:?}", response.id);

        let result = self
            .outbound
            .send(SseEvent {
                event: MESSAGE_EVENT,
                data,
            })
            .await
            .map_err(|_| {
                McpError::from(ProtocolError::Transport("SSE stream closed".into()))
            });

        if let Err(e) = &result {
            self.report_error(e);
        }
        result
    }

    fn close(&self) {
        self.notify_closed();
    }
}

/// Outbound SSE event stream handed to the HTTP layer.
///
/// Dropping it (the client disconnected, or the response was never sent)
/// closes the owning transport.
pub struct SseStream {
    rx: mpsc::Receiver<SseEvent>,
    transport: Arc<SseServerTransport>,
}

impl Stream for SseStream {
    type Item = SseEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for SseStream {
    fn drop(&mut self) {
        self.transport.notify_closed();
    }
}
