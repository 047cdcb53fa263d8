//! CDP WebSocket connection implementation
//!
//! This module provides WebSocket-based connection to Chrome DevTools Protocol.
//! The socket is split: commands are written through a locked sink while a
//! background task reads frames and routes responses back to their callers.

use super::traits::{CdpConnection, CdpError as CdpErrorResponse, CdpResponse};
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingMap = Arc<Mutex<HashMap<u64, PendingCommand>>>;

/// CDP timeout configuration
#[derive(Debug, Clone)]
struct CdpTimeoutConfig {
    /// Default timeout for most commands (seconds)
    default_timeout_secs: u64,
    /// Timeout for screenshot commands (seconds)
    screenshot_timeout_secs: u64,
    /// Timeout for page navigation commands (seconds)
    navigation_timeout_secs: u64,
    /// Timeout for JavaScript execution (seconds)
    execution_timeout_secs: u64,
}

impl Default for CdpTimeoutConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            screenshot_timeout_secs: 90,
            navigation_timeout_secs: 60,
            execution_timeout_secs: 30,
        }
    }
}

impl CdpTimeoutConfig {
    /// Get timeout duration for a specific command method
    fn get_timeout_for_command(&self, method: &str) -> tokio::time::Duration {
        let method_lower = method.to_lowercase();

        if method_lower.contains("screenshot") || method_lower.contains("capture") {
            return tokio::time::Duration::from_secs(self.screenshot_timeout_secs);
        }

        if method_lower.contains("navigate") || method_lower.contains("reload") {
            return tokio::time::Duration::from_secs(self.navigation_timeout_secs);
        }

        if method_lower.starts_with("runtime.evaluate") || method_lower.starts_with("runtime.call") {
            return tokio::time::Duration::from_secs(self.execution_timeout_secs);
        }

        tokio::time::Duration::from_secs(self.default_timeout_secs)
    }
}

/// Pending command response
#[derive(Debug)]
struct PendingCommand {
    /// Response channel sender
    sender: tokio::sync::oneshot::Sender<CdpResponse>,
    /// Command method (for logging)
    method: String,
}

/// CDP WebSocket connection implementation
#[derive(Debug)]
pub struct CdpWebSocketConnection {
    /// WebSocket URL
    url: String,
    /// Write half of the socket
    sink: Mutex<Option<SplitSink<WsStream, Message>>>,
    /// Next command ID
    next_id: AtomicU64,
    /// Pending commands (ID -> response sender)
    pending_commands: PendingMap,
    /// Is connection active
    is_active: Arc<AtomicBool>,
    /// Reader task
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
    /// Timeout configuration
    timeout_config: CdpTimeoutConfig,
}

impl CdpWebSocketConnection {
    /// Connect to a CDP target
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:9222/devtools/page/ABC123")
    pub async fn new<S: Into<String>>(url: S) -> Result<Arc<Self>, Error> {
        let url = url.into();
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;

        let (sink, stream) = ws_stream.split();
        let pending_commands: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let is_active = Arc::new(AtomicBool::new(true));

        let reader = tokio::spawn(Self::read_loop(
            stream,
            Arc::clone(&pending_commands),
            Arc::clone(&is_active),
        ));

        info!("WebSocket connection established");

        Ok(Arc::new(Self {
            url,
            sink: Mutex::new(Some(sink)),
            next_id: AtomicU64::new(1),
            pending_commands,
            is_active,
            reader: std::sync::Mutex::new(Some(reader)),
            timeout_config: CdpTimeoutConfig::default(),
        }))
    }

    /// Target URL of this connection
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read frames until the socket closes, routing responses to waiters
    async fn read_loop(mut stream: SplitStream<WsStream>, pending_commands: PendingMap, is_active: Arc<AtomicBool>) {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => Self::dispatch(&text, &pending_commands).await,
                Ok(Message::Close(_)) => {
                    info!("WebSocket close frame received");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error, deactivating connection: {}", e);
                    break;
                }
            }
        }

        is_active.store(false, Ordering::SeqCst);

        // Dropping the senders wakes every waiter with a closed channel.
        let mut pending = pending_commands.lock().await;
        if !pending.is_empty() {
            warn!("Connection closed with {} commands in flight", pending.len());
        }
        pending.clear();
    }

    /// Route one incoming frame
    async fn dispatch(text: &str, pending_commands: &PendingMap) {
        let incoming: CdpIncoming = match serde_json::from_str(text) {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!("Unknown message format ({}): {}", e, text);
                return;
            }
        };

        match (incoming.id, incoming.method) {
            (Some(id), _) => {
                let Some(pending_cmd) = pending_commands.lock().await.remove(&id) else {
                    warn!("Received response for unknown command ID: {}", id);
                    return;
                };

                debug!("Received response for command {}: {}", id, pending_cmd.method);

                let response = CdpResponse {
                    id,
                    result: incoming.result,
                    error: incoming.error.map(|e| CdpErrorResponse {
                        code: e.code,
                        message: e.message,
                        data: e.data,
                    }),
                };

                let _ = pending_cmd.sender.send(response);
            }
            (None, Some(method)) => debug!("Received event: {}", method),
            (None, None) => warn!("Frame with neither id nor method: {}", text),
        }
    }

    /// Send WebSocket message
    async fn send_message(&self, message: Message) -> Result<(), Error> {
        let mut sink_guard = self.sink.lock().await;
        let sink = sink_guard
            .as_mut()
            .ok_or_else(|| Error::websocket("WebSocket stream not available"))?;

        sink.send(message)
            .await
            .map_err(|e| Error::websocket(format!("Failed to send message: {}", e)))
    }
}

#[async_trait]
impl CdpConnection for CdpWebSocketConnection {
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };

        let json = serde_json::to_string(&request)
            .map_err(|e| Error::cdp(format!("Failed to serialize request: {}", e)))?;

        debug!("Sending CDP command {}: {}", id, method);

        let (sender, receiver) = tokio::sync::oneshot::channel();
        self.pending_commands.lock().await.insert(
            id,
            PendingCommand {
                sender,
                method: method.to_string(),
            },
        );

        if let Err(e) = self.send_message(Message::Text(json)).await {
            self.pending_commands.lock().await.remove(&id);
            return Err(e);
        }

        let timeout_duration = self.timeout_config.get_timeout_for_command(method);

        match tokio::time::timeout(timeout_duration, receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = &response.error {
                    return Err(Error::cdp(format!(
                        "{}: {} (code: {})",
                        method, error.message, error.code
                    )));
                }
                Ok(response)
            }
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed while waiting for {} (command {})",
                method, id
            ))),
            Err(_) => {
                self.pending_commands.lock().await.remove(&id);
                Err(Error::timeout(format!("Command {} ({}) timed out", id, method)))
            }
        }
    }

    async fn close(&self) -> Result<(), Error> {
        info!("Closing CDP WebSocket connection to {}", self.url);

        self.is_active.store(false, Ordering::SeqCst);

        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                debug!("WebSocket close handshake failed: {}", e);
            }
        }

        let reader = self
            .reader
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .take();
        if let Some(reader) = reader {
            reader.abort();
        }

        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_selection() {
        let config = CdpTimeoutConfig::default();
        assert_eq!(config.get_timeout_for_command("Page.captureScreenshot").as_secs(), 90);
        assert_eq!(config.get_timeout_for_command("Page.navigate").as_secs(), 60);
        assert_eq!(config.get_timeout_for_command("Runtime.evaluate").as_secs(), 30);
        assert_eq!(config.get_timeout_for_command("Input.dispatchMouseEvent").as_secs(), 30);
    }

    #[tokio::test]
    async fn test_dispatch_routes_response_to_waiter() {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (sender, receiver) = tokio::sync::oneshot::channel();
        pending.lock().await.insert(
            3,
            PendingCommand {
                sender,
                method: "Runtime.evaluate".to_string(),
            },
        );

        CdpWebSocketConnection::dispatch(
            r#"{"id":3,"result":{"result":{"type":"string","value":"ok"}}}"#,
            &pending,
        )
        .await;

        let response = receiver.await.unwrap();
        assert_eq!(response.id, 3);
        assert!(response.error.is_none());
        assert!(pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_carries_protocol_error() {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (sender, receiver) = tokio::sync::oneshot::channel();
        pending.lock().await.insert(
            4,
            PendingCommand {
                sender,
                method: "DOM.focus".to_string(),
            },
        );

        CdpWebSocketConnection::dispatch(
            r#"{"id":4,"error":{"code":-32000,"message":"Element is not focusable"}}"#,
            &pending,
        )
        .await;

        let response = receiver.await.unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "Element is not focusable");
    }

    #[tokio::test]
    async fn test_dispatch_ignores_events_and_garbage() {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        CdpWebSocketConnection::dispatch(r#"{"method":"Page.frameNavigated","params":{}}"#, &pending).await;
        CdpWebSocketConnection::dispatch("not json", &pending).await;
        assert!(pending.lock().await.is_empty());
    }
}
