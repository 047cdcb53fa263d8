//! CDP (Chrome DevTools Protocol) type definitions
//!
//! Wire structures for the commands and HTTP endpoints the suite uses.

use serde::{Deserialize, Serialize};

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// Incoming CDP frame: either a response (has `id`) or an event (has `method`)
#[derive(Debug, Clone, Deserialize)]
pub struct CdpIncoming {
    /// Response ID, absent for events
    #[serde(default)]
    pub id: Option<u64>,
    /// Event method, absent for responses
    #[serde(default)]
    pub method: Option<String>,
    /// Response result
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error if any
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// CDP error detail
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Page navigation parameters
#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
}

/// Page navigation response
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigateResponse {
    /// Frame the navigation happened in
    pub frame_id: Option<String>,
    /// Loader ID, absent for same-document navigations
    pub loader_id: Option<String>,
    /// Set when the navigation failed (DNS, refused connection...)
    pub error_text: Option<String>,
}

/// JavaScript evaluation parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    /// JavaScript expression to evaluate
    pub expression: String,
    /// Whether to await promise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
    /// Whether to return as value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
}

/// Remote object (result of JavaScript evaluation)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteObject {
    /// Object type
    #[serde(default)]
    pub r#type: String,
    /// Object subtype
    #[serde(default)]
    pub subtype: Option<String>,
    /// Object value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Object description
    #[serde(default)]
    pub description: Option<String>,
}

/// Exception details
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Exception text
    #[serde(default)]
    pub text: Option<String>,
    /// Exception object
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Best human-readable description of the exception
    pub fn describe(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .or_else(|| self.text.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// JavaScript evaluation response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    /// Evaluation result
    #[serde(default)]
    pub result: RemoteObject,
    /// Exception details if evaluation failed
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}

/// Mouse event parameters for `Input.dispatchMouseEvent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseEventParams {
    /// mousePressed, mouseReleased or mouseMoved
    pub r#type: &'static str,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_count: Option<u32>,
}

/// Key event parameters for `Input.dispatchKeyEvent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEventParams {
    /// keyDown, keyUp or char
    pub r#type: &'static str,
    pub key: &'static str,
    pub code: &'static str,
    pub windows_virtual_key_code: u32,
    pub native_virtual_key_code: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'static str>,
}

/// Window bounds for `Browser.setWindowBounds`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBounds {
    /// normal, minimized, maximized or fullscreen
    pub window_state: &'static str,
}

/// Entry of the `/json/new` and `/json/list` HTTP endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    /// Target ID
    pub id: String,
    /// Target type ("page", "service_worker", ...)
    #[serde(default, rename = "type")]
    pub target_type: String,
    /// Target title
    #[serde(default)]
    pub title: String,
    /// Target URL
    #[serde(default)]
    pub url: String,
    /// WebSocket URL for this target
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

/// Body of the `/json/version` HTTP endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct VersionDescriptor {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    #[serde(rename = "User-Agent", default)]
    pub user_agent: String,
    #[serde(rename = "V8-Version", default)]
    pub js_version: String,
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_request_serialization() {
        let request = CdpRequest {
            id: 1,
            method: "Page.navigate".to_string(),
            params: Some(serde_json::json!({ "url": "https://example.com" })),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"Page.navigate\""));
    }

    #[test]
    fn test_cdp_request_without_params() {
        let request = CdpRequest {
            id: 2,
            method: "Page.enable".to_string(),
            params: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("\"params\""));
    }

    #[test]
    fn test_incoming_distinguishes_events_from_responses() {
        let response: CdpIncoming =
            serde_json::from_str(r#"{"id":7,"result":{"frameId":"F"}}"#).unwrap();
        assert_eq!(response.id, Some(7));
        assert!(response.method.is_none());

        let event: CdpIncoming =
            serde_json::from_str(r#"{"method":"Page.loadEventFired","params":{"timestamp":1.0}}"#)
                .unwrap();
        assert!(event.id.is_none());
        assert_eq!(event.method.as_deref(), Some("Page.loadEventFired"));
    }

    #[test]
    fn test_key_event_uses_protocol_field_names() {
        let params = KeyEventParams {
            r#type: "keyDown",
            key: "Enter",
            code: "Enter",
            windows_virtual_key_code: 13,
            native_virtual_key_code: 13,
            text: Some("\r"),
        };

        let value = serde_json::to_value(params).unwrap();
        assert_eq!(value["type"], "keyDown");
        assert_eq!(value["windowsVirtualKeyCode"], 13);
        assert_eq!(value["text"], "\r");
    }

    #[test]
    fn test_version_descriptor_parsing() {
        let version: VersionDescriptor = serde_json::from_str(
            r#"{"Browser":"Chrome/126.0","Protocol-Version":"1.3","User-Agent":"UA","V8-Version":"12.6"}"#,
        )
        .unwrap();
        assert_eq!(version.browser, "Chrome/126.0");
        assert_eq!(version.protocol_version, "1.3");
        assert!(version.web_socket_debugger_url.is_none());
    }
}
