//! CDP browser control implementation
//!
//! Browser-level operations go through the DevTools HTTP endpoints
//! (`/json/version`, `/json/new`, `/json/close`); page-level traffic goes
//! through one WebSocket connection per target.

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use super::types::{TargetDescriptor, VersionDescriptor};
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// CDP browser implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// Browser endpoint (e.g., "ws://localhost:9222")
    endpoint: String,
    /// HTTP client for the DevTools endpoints
    http: reqwest::Client,
    /// Active connections (target_id -> connection)
    connections: tokio::sync::Mutex<HashMap<String, Arc<dyn CdpConnection>>>,
}

impl CdpBrowserImpl {
    /// Create a new CDP browser controller
    ///
    /// # Arguments
    /// * `endpoint` - Browser endpoint, `ws://` or `http://` (e.g., "ws://localhost:9222")
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        info!("Creating CDP browser controller for endpoint: {}", endpoint);
        Self {
            endpoint,
            http: reqwest::Client::new(),
            connections: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Endpoint this controller talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// HTTP base URL of the DevTools endpoints
    fn http_endpoint(&self) -> String {
        self.endpoint
            .replace("ws://", "http://")
            .replace("wss://", "https://")
    }

    fn target_id_from_ws_url(ws_url: &str) -> String {
        ws_url.rsplit('/').next().unwrap_or("unknown").to_string()
    }
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    async fn create_client(&self, target_ws_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        debug!("Creating CDP client for target: {}", target_ws_url);

        let connection = CdpWebSocketConnection::new(target_ws_url).await?;

        self.connections.lock().await.insert(
            Self::target_id_from_ws_url(target_ws_url),
            Arc::clone(&connection) as Arc<dyn CdpConnection>,
        );

        let client = Arc::new(CdpClientImpl::new(connection));

        // Page and Runtime are all the suite needs
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;

        Ok(client)
    }

    async fn close(&self) -> Result<(), Error> {
        let mut connections = self.connections.lock().await;
        info!("CdpBrowser::close: Closing {} active CDP connections", connections.len());

        for (target_id, connection) in connections.drain() {
            if let Err(e) = connection.close().await {
                warn!("CdpBrowser::close: Failed to close connection to {}: {}", target_id, e);
            }
        }

        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        let url = format!("{}/json/version", self.http_endpoint());
        debug!("Fetching browser version from {}", url);

        let version: VersionDescriptor = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::browser_launch(format!("Failed to connect to browser at {}: {}", url, e)))?
            .json()
            .await
            .map_err(|e| Error::cdp(format!("Failed to parse version: {}", e)))?;

        Ok(BrowserVersion {
            protocol_version: version.protocol_version,
            product: version.browser,
            user_agent: version.user_agent,
            js_version: version.js_version,
        })
    }

    async fn create_target(&self, url: &str) -> Result<TargetInfo, Error> {
        let new_url = format!("{}/json/new?{}", self.http_endpoint(), url);
        debug!("Creating new page via HTTP API: {}", new_url);

        let response = self.http.put(&new_url).send().await.map_err(|e| {
            Error::browser_launch(format!(
                r#"Failed to connect to CDP endpoint at {}.
Start a Chromium-family browser with remote debugging, for example:
  google-chrome --remote-debugging-port=9222 --user-data-dir=/tmp/storefront-e2e
Original error: {}"#,
                self.endpoint, e
            ))
        })?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::cdp(format!("Failed to read response: {}", e)))?;

        let target: TargetDescriptor = serde_json::from_str(&body).map_err(|e| {
            Error::cdp(format!(
                "Failed to parse new target response: {} (response was: {})",
                e, body
            ))
        })?;

        let ws_url = target
            .web_socket_debugger_url
            .ok_or_else(|| Error::cdp("No webSocketDebuggerUrl in new target response"))?;

        info!("Created target {} ({})", target.id, target.target_type);

        Ok(TargetInfo {
            target_id: target.id,
            ws_url,
        })
    }

    async fn close_target(&self, target_id: &str) -> Result<(), Error> {
        if let Some(connection) = self.connections.lock().await.remove(target_id) {
            if let Err(e) = connection.close().await {
                debug!("Closing connection to {} failed: {}", target_id, e);
            }
        }

        let url = format!("{}/json/close/{}", self.http_endpoint(), target_id);
        debug!("Closing target via HTTP API: {}", url);

        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::cdp(format!("Failed to close target {}: {}", target_id, e)))?;

        Ok(())
    }
}
