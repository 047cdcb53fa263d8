//! CDP-backed browser session
//!
//! One session drives one page target. Locators are resolved in the page on
//! every call through the probe scripts, and input goes through
//! `Input.dispatchMouseEvent` / `Input.dispatchKeyEvent` so the page sees
//! trusted events.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cdp::traits::{CdpBrowser, CdpClient, EvaluationResult, ScreenshotFormat};
use crate::cdp::types::{KeyEventParams, MouseEventParams, WindowBounds};
use crate::session::scripts::{self, Probe, ProbeResult, Rect};
use crate::session::traits::{BrowserSession, ElementState, Key, Locator, Timeouts};
use crate::{Error, Result};

/// Browser session over one CDP page target
#[derive(Debug)]
pub struct CdpSession {
    id: String,
    target_id: String,
    client: Arc<dyn CdpClient>,
    browser: Arc<dyn CdpBrowser>,
    viewport: (u32, u32),
    is_active: AtomicBool,
}

impl CdpSession {
    /// Create a session for an already attached target
    pub fn new(
        target_id: String,
        client: Arc<dyn CdpClient>,
        browser: Arc<dyn CdpBrowser>,
        viewport: (u32, u32),
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            target_id,
            client,
            browser,
            viewport,
            is_active: AtomicBool::new(true),
        }
    }

    /// Open a new page target on `browser` and attach to it
    pub async fn open(browser: Arc<dyn CdpBrowser>, viewport: (u32, u32)) -> Result<Self> {
        let target = browser.create_target("about:blank").await?;
        let client = browser.create_client(&target.ws_url).await?;
        info!("Opened page target {}", target.target_id);
        Ok(Self::new(target.target_id, client, browser, viewport))
    }

    /// Page target this session drives
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::session_closed(&self.id))
        }
    }

    async fn evaluate_string(&self, script: &str) -> Result<String> {
        match self.client.evaluate(script, false).await? {
            EvaluationResult::String(s) => Ok(s),
            other => Err(Error::script_execution_failed(format!(
                "Expected a string result, got {:?}",
                other
            ))),
        }
    }

    /// Run a probe against the locator's single match
    async fn probe<T: DeserializeOwned>(&self, locator: &Locator, probe: Probe) -> Result<T> {
        self.ensure_active()?;

        let script = scripts::probe_script(locator.selector(), probe);
        let raw = self.evaluate_string(&script).await?;
        let result: ProbeResult<T> = serde_json::from_str(&raw)?;

        match result.count {
            0 => Err(Error::element_not_found(locator.to_string())),
            1 => result.value.ok_or_else(|| {
                Error::script_execution_failed(format!("Probe {:?} returned no value for {}", probe, locator))
            }),
            n => Err(Error::ambiguous_element(locator.to_string(), n)),
        }
    }

    async fn focus(&self, locator: &Locator) -> Result<()> {
        let focused: bool = self.probe(locator, Probe::Focus).await?;
        if !focused {
            return Err(Error::script_execution_failed(format!(
                "Element {} cannot take keyboard focus",
                locator
            )));
        }
        Ok(())
    }

    async fn dispatch_mouse(&self, r#type: &'static str, x: f64, y: f64) -> Result<()> {
        let pressing = r#type != "mouseMoved";
        let params = MouseEventParams {
            r#type,
            x,
            y,
            button: pressing.then_some("left"),
            click_count: pressing.then_some(1),
        };
        self.client
            .call_method("Input.dispatchMouseEvent", serde_json::to_value(params)?)
            .await?;
        Ok(())
    }

    async fn dispatch_key(&self, r#type: &'static str, key: Key) -> Result<()> {
        let params = KeyEventParams {
            r#type,
            key: key.key(),
            code: key.key(),
            windows_virtual_key_code: key.key_code(),
            native_virtual_key_code: key.key_code(),
            text: if r#type == "keyDown" { key.text() } else { None },
        };
        self.client
            .call_method("Input.dispatchKeyEvent", serde_json::to_value(params)?)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_active()?;
        let result = self.client.navigate(url).await?;
        debug!("Session {} navigated to {}", self.id, result.url);
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        self.ensure_active()?;
        self.evaluate_string("document.title").await
    }

    async fn current_url(&self) -> Result<String> {
        self.ensure_active()?;
        self.evaluate_string("window.location.href").await
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.ensure_active()?;
        match self.client.evaluate(&scripts::count_script(locator.selector()), false).await? {
            EvaluationResult::Number(n) if n >= 0.0 => Ok(n as usize),
            other => Err(Error::script_execution_failed(format!(
                "Expected a match count for {}, got {:?}",
                locator, other
            ))),
        }
    }

    async fn element_state(&self, locator: &Locator) -> Result<ElementState> {
        self.probe(locator, Probe::State).await
    }

    async fn text(&self, locator: &Locator) -> Result<String> {
        self.probe(locator, Probe::Text).await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let state: ElementState = self.probe(locator, Probe::State).await?;
        if !state.clickable() {
            return Err(Error::script_execution_failed(format!(
                "Element {} is not interactable (displayed: {}, enabled: {})",
                locator, state.displayed, state.enabled
            )));
        }

        let rect: Rect = self.probe(locator, Probe::Rect).await?;
        if rect.is_empty() {
            return Err(Error::script_execution_failed(format!(
                "Element {} has no clickable area",
                locator
            )));
        }

        let (x, y) = rect.center();
        debug!("Clicking {} at ({:.1}, {:.1})", locator, x, y);
        self.dispatch_mouse("mouseMoved", x, y).await?;
        self.dispatch_mouse("mousePressed", x, y).await?;
        self.dispatch_mouse("mouseReleased", x, y).await?;
        Ok(())
    }

    async fn send_keys(&self, locator: &Locator, text: &str) -> Result<()> {
        self.focus(locator).await?;
        self.client
            .call_method("Input.insertText", json!({ "text": text }))
            .await?;
        Ok(())
    }

    async fn press_key(&self, locator: &Locator, key: Key) -> Result<()> {
        self.focus(locator).await?;
        self.dispatch_key("keyDown", key).await?;
        self.dispatch_key("keyUp", key).await?;
        Ok(())
    }

    async fn set_timeouts(&self, timeouts: Timeouts) -> Result<()> {
        self.ensure_active()?;
        self.client.set_timeouts(timeouts.page_load, timeouts.script);
        Ok(())
    }

    async fn maximize_window(&self) -> Result<()> {
        self.ensure_active()?;

        let window = self
            .client
            .call_method("Browser.getWindowForTarget", json!({ "targetId": self.target_id }))
            .await;

        let maximized = match window.ok().and_then(|w| w.get("windowId").and_then(|id| id.as_i64())) {
            Some(window_id) => {
                let bounds = serde_json::to_value(WindowBounds { window_state: "maximized" })?;
                self.client
                    .call_method(
                        "Browser.setWindowBounds",
                        json!({ "windowId": window_id, "bounds": bounds }),
                    )
                    .await
                    .is_ok()
            }
            None => false,
        };

        if !maximized {
            // Headless windows have no window manager to maximize against
            debug!("Window bounds unavailable, emulating {}x{} viewport", self.viewport.0, self.viewport.1);
            self.client
                .call_method(
                    "Emulation.setDeviceMetricsOverride",
                    json!({
                        "width": self.viewport.0,
                        "height": self.viewport.1,
                        "deviceScaleFactor": 1,
                        "mobile": false,
                    }),
                )
                .await?;
        }

        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.ensure_active()?;
        self.client.screenshot(ScreenshotFormat::Png).await
    }

    async fn quit(&self) -> Result<()> {
        if !self.is_active.swap(false, Ordering::AcqRel) {
            debug!("Session {} already closed", self.id);
            return Ok(());
        }

        info!("Closing session {} (target {})", self.id, self.target_id);

        if let Err(e) = self.browser.close_target(&self.target_id).await {
            warn!("Failed to close target {}: {}", self.target_id, e);
        }
        if let Err(e) = self.client.connection().close().await {
            warn!("Failed to close connection for session {}: {}", self.id, e);
        }

        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }
}
