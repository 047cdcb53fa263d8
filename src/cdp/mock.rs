//! Mock CDP implementation for testing
//!
//! The mock connection answers commands from canned responses and records
//! everything it was sent, so the real client and session code can be driven
//! without a browser.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::cdp::client::CdpClientImpl;
use crate::cdp::traits::*;
use crate::Error;

type ScriptResponder = Box<dyn Fn(&str) -> Value + Send + Sync>;

/// 1x1 transparent PNG
const MOCK_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Mock CDP connection
pub struct MockCdpConnection {
    is_active: AtomicBool,
    next_id: AtomicU64,
    responses: Mutex<HashMap<String, Value>>,
    script_responder: Mutex<Option<ScriptResponder>>,
    commands: Mutex<Vec<(String, Value)>>,
}

impl std::fmt::Debug for MockCdpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCdpConnection")
            .field("is_active", &self.is_active)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl MockCdpConnection {
    /// Create a new mock CDP connection
    pub fn new() -> Self {
        Self {
            is_active: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            responses: Mutex::new(HashMap::new()),
            script_responder: Mutex::new(None),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Answer every `method` command with `result`
    pub fn respond_with(&self, method: &str, result: Value) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(method.to_string(), result);
        }
    }

    /// Answer `Runtime.evaluate` by mapping the expression to a plain JSON value
    pub fn respond_to_scripts<F>(&self, responder: F)
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.script_responder.lock() {
            *slot = Some(Box::new(responder));
        }
    }

    /// Every command sent so far, in order
    pub fn commands(&self) -> Vec<(String, Value)> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Commands sent for one method
    pub fn commands_for(&self, method: &str) -> Vec<Value> {
        self.commands()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params)
            .collect()
    }

    fn wrap_remote(value: Value) -> Value {
        let remote = match &value {
            Value::String(_) => json!({ "type": "string", "value": value }),
            Value::Number(_) => json!({ "type": "number", "value": value }),
            Value::Bool(_) => json!({ "type": "boolean", "value": value }),
            Value::Null => json!({ "type": "object", "subtype": "null", "value": null }),
            _ => json!({ "type": "object", "value": value }),
        };
        json!({ "result": remote })
    }

    fn default_result(&self, method: &str, params: &Value) -> Value {
        match method {
            "Page.navigate" => json!({
                "frameId": uuid::Uuid::new_v4().to_string(),
                "loaderId": uuid::Uuid::new_v4().to_string(),
            }),
            "Runtime.evaluate" => {
                let expression = params.get("expression").and_then(Value::as_str).unwrap_or("");
                let responder = self.script_responder.lock().ok();
                let value = match responder.as_ref().and_then(|r| r.as_ref()) {
                    Some(respond) => respond(expression),
                    None if expression == "document.readyState" => json!("complete"),
                    None => json!("mock result"),
                };
                Self::wrap_remote(value)
            }
            "Page.captureScreenshot" => json!({ "data": MOCK_PNG_BASE64 }),
            "Browser.getWindowForTarget" => json!({
                "windowId": 1,
                "bounds": { "left": 0, "top": 0, "width": 1280, "height": 720, "windowState": "normal" }
            }),
            _ => json!({}),
        }
    }
}

impl Default for MockCdpConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, params: Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut commands) = self.commands.lock() {
            commands.push((method.to_string(), params.clone()));
        }

        let canned = self
            .responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(method).cloned());
        let result = canned.unwrap_or_else(|| self.default_result(method, &params));

        Ok(CdpResponse {
            id,
            result: Some(result),
            error: None,
        })
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

/// Mock CDP browser
///
/// Hands out real [`CdpClientImpl`]s over [`MockCdpConnection`]s.
#[derive(Debug, Default)]
pub struct MockCdpBrowser {
    closed: AtomicBool,
    connections: Mutex<Vec<Arc<MockCdpConnection>>>,
    closed_targets: Mutex<Vec<String>>,
}

impl MockCdpBrowser {
    /// Create a new mock CDP browser
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections handed out so far
    pub fn connections(&self) -> Vec<Arc<MockCdpConnection>> {
        self.connections.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Targets closed through [`CdpBrowser::close_target`]
    pub fn closed_targets(&self) -> Vec<String> {
        self.closed_targets.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CdpBrowser for MockCdpBrowser {
    async fn create_client(&self, _target_ws_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::cdp("Browser is closed"));
        }

        let connection = Arc::new(MockCdpConnection::new());
        if let Ok(mut connections) = self.connections.lock() {
            connections.push(Arc::clone(&connection));
        }

        Ok(Arc::new(CdpClientImpl::new(connection)))
    }

    async fn close(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::Relaxed);
        for connection in self.connections() {
            connection.close().await?;
        }
        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        Ok(BrowserVersion {
            protocol_version: "1.3".to_string(),
            product: "Chrome/126.0.0.0".to_string(),
            user_agent: "Mock Chrome/126.0.0.0".to_string(),
            js_version: "12.6.0.0".to_string(),
        })
    }

    async fn create_target(&self, url: &str) -> Result<TargetInfo, Error> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::cdp("Browser is closed"));
        }

        let target_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!("Mock: created target {} for {}", target_id, url);
        Ok(TargetInfo {
            ws_url: format!("ws://localhost:9222/devtools/page/{}", target_id),
            target_id,
        })
    }

    async fn close_target(&self, target_id: &str) -> Result<(), Error> {
        if let Ok(mut closed) = self.closed_targets.lock() {
            closed.push(target_id.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_connection_records_commands() {
        let conn = MockCdpConnection::new();
        assert!(conn.is_active());

        let response = conn
            .send_command("Input.dispatchMouseEvent", json!({ "type": "mousePressed" }))
            .await
            .unwrap();
        assert!(response.result.is_some());
        assert_eq!(conn.commands_for("Input.dispatchMouseEvent").len(), 1);
    }

    #[tokio::test]
    async fn test_mock_connection_rejects_after_close() {
        let conn = MockCdpConnection::new();
        conn.close().await.unwrap();
        assert!(conn.send_command("Page.enable", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_browser_hands_out_clients() {
        let browser = MockCdpBrowser::new();
        let target = browser.create_target("about:blank").await.unwrap();
        assert!(target.ws_url.ends_with(&target.target_id));

        let client = browser.create_client(&target.ws_url).await.unwrap();
        let title = client.evaluate("document.readyState", false).await.unwrap();
        assert_eq!(title, EvaluationResult::String("complete".to_string()));

        let version = browser.get_version().await.unwrap();
        assert_eq!(version.product, "Chrome/126.0.0.0");
    }
}
