//! CDP client implementation
//!
//! This module provides a high-level CDP client with typed methods for common operations.

use super::traits::*;
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// Interval between `document.readyState` checks after a navigation
const READY_STATE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
struct ClientTimeouts {
    page_load: Duration,
    script: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(30),
            script: Duration::from_secs(30),
        }
    }
}

/// CDP client implementation
#[derive(Debug)]
pub struct CdpClientImpl {
    /// Underlying CDP connection
    connection: Arc<dyn CdpConnection>,
    timeouts: RwLock<ClientTimeouts>,
}

impl CdpClientImpl {
    /// Create a new CDP client
    ///
    /// # Arguments
    /// * `connection` - CDP connection instance
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self {
            connection,
            timeouts: RwLock::new(ClientTimeouts::default()),
        }
    }

    fn current_timeouts(&self) -> ClientTimeouts {
        self.timeouts.read().map(|t| *t).unwrap_or_default()
    }

    /// Parse remote object value to evaluation result
    fn parse_remote_object(obj: &RemoteObject) -> EvaluationResult {
        match obj.r#type.as_str() {
            "string" => EvaluationResult::String(
                obj.value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            ),
            "number" => EvaluationResult::Number(
                obj.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0),
            ),
            "boolean" => EvaluationResult::Bool(
                obj.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false),
            ),
            "object" if obj.subtype.as_deref() == Some("null") => EvaluationResult::Null,
            "object" => EvaluationResult::Object(obj.value.clone().unwrap_or(serde_json::Value::Null)),
            _ => EvaluationResult::Null,
        }
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::clone(&self.connection)
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        info!("Navigating to {}", url);

        let params = serde_json::to_value(NavigateParams { url: url.to_string() })?;
        let result = self.call_method("Page.navigate", params).await?;
        let response: NavigateResponse = serde_json::from_value(result)?;

        if let Some(error_text) = response.error_text {
            return Err(Error::cdp(format!("Navigation to {} failed: {}", url, error_text)));
        }

        // Poll document.readyState; load events race with the navigate response.
        let page_load = self.current_timeouts().page_load;
        let deadline = tokio::time::Instant::now() + page_load;
        loop {
            tokio::time::sleep(READY_STATE_POLL).await;

            match self.evaluate("document.readyState", false).await {
                Ok(EvaluationResult::String(state)) if state == "complete" => break,
                Ok(state) => debug!("Document ready state: {:?}", state),
                Err(e) => debug!("Error checking ready state: {}", e),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::timeout(format!(
                    "Page {} did not finish loading within {:?}",
                    url, page_load
                )));
            }
        }

        let current_url = match self.evaluate("window.location.href", false).await? {
            EvaluationResult::String(href) => href,
            _ => url.to_string(),
        };

        Ok(NavigationResult {
            frame_id: response.frame_id,
            url: current_url,
        })
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        let params = serde_json::to_value(EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
        })?;

        let script_timeout = self.current_timeouts().script;
        let result = tokio::time::timeout(script_timeout, self.call_method("Runtime.evaluate", params))
            .await
            .map_err(|_| Error::timeout(format!("Script did not finish within {:?}", script_timeout)))??;

        let response: EvaluateResponse = serde_json::from_value(result)
            .map_err(|e| Error::cdp(format!("Failed to parse EvaluateResponse: {}", e)))?;

        if let Some(exception) = response.exception_details {
            return Err(Error::script_execution_failed(exception.describe()));
        }

        Ok(Self::parse_remote_object(&response.result))
    }

    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        debug!("Capturing screenshot");

        let params = match format {
            ScreenshotFormat::Png => serde_json::json!({ "format": "png" }),
            ScreenshotFormat::Jpeg(quality) => serde_json::json!({ "format": "jpeg", "quality": quality }),
        };

        let result = self.call_method("Page.captureScreenshot", params).await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain: {}", domain);
        self.call_method(&format!("{}.enable", domain), serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;
        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    fn set_timeouts(&self, page_load: Duration, script: Duration) {
        if let Ok(mut timeouts) = self.timeouts.write() {
            *timeouts = ClientTimeouts { page_load, script };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::MockCdpConnection;

    fn remote(kind: &str, subtype: Option<&str>, value: Option<serde_json::Value>) -> RemoteObject {
        RemoteObject {
            r#type: kind.to_string(),
            subtype: subtype.map(str::to_string),
            value,
            description: None,
        }
    }

    #[test]
    fn test_parse_remote_object_string() {
        let result = CdpClientImpl::parse_remote_object(&remote("string", None, Some(serde_json::json!("test"))));
        assert_eq!(result, EvaluationResult::String("test".to_string()));
    }

    #[test]
    fn test_parse_remote_object_number() {
        let result = CdpClientImpl::parse_remote_object(&remote("number", None, Some(serde_json::json!(42.5))));
        assert_eq!(result, EvaluationResult::Number(42.5));
    }

    #[test]
    fn test_parse_remote_object_null_subtype() {
        let result = CdpClientImpl::parse_remote_object(&remote("object", Some("null"), None));
        assert_eq!(result, EvaluationResult::Null);
    }

    #[test]
    fn test_parse_remote_object_undefined() {
        let result = CdpClientImpl::parse_remote_object(&remote("undefined", None, None));
        assert_eq!(result, EvaluationResult::Null);
    }

    #[tokio::test]
    async fn test_evaluate_surfaces_exceptions() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_with(
            "Runtime.evaluate",
            serde_json::json!({
                "result": { "type": "object", "subtype": "error" },
                "exceptionDetails": {
                    "text": "Uncaught",
                    "exception": { "type": "object", "description": "ReferenceError: nope is not defined" }
                }
            }),
        );

        let client = CdpClientImpl::new(connection);
        let err = client.evaluate("nope", false).await.unwrap_err();
        assert!(matches!(err, Error::ScriptExecutionFailed(ref msg) if msg.contains("ReferenceError")));
    }

    #[tokio::test]
    async fn test_navigate_reports_error_text() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_with(
            "Page.navigate",
            serde_json::json!({ "frameId": "F1", "errorText": "net::ERR_NAME_NOT_RESOLVED" }),
        );

        let client = CdpClientImpl::new(connection);
        let err = client.navigate("https://shop.invalid").await.unwrap_err();
        assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_times_out_when_document_never_completes() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_with("Page.navigate", serde_json::json!({ "frameId": "F1" }));
        connection.respond_with(
            "Runtime.evaluate",
            serde_json::json!({ "result": { "type": "string", "value": "loading" } }),
        );

        let client = CdpClientImpl::new(connection);
        client.set_timeouts(Duration::from_millis(500), Duration::from_secs(1));

        let err = client.navigate("https://shop.example").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_screenshot_decodes_base64() {
        let connection = Arc::new(MockCdpConnection::new());
        let client = CdpClientImpl::new(connection);
        let png = client.screenshot(ScreenshotFormat::Png).await.unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
