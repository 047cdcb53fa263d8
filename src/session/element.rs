//! Locator-bound element handles
//!
//! A handle never caches a DOM node. Every access resolves the locator again,
//! so a handle stays valid across re-renders and can be created before the
//! element exists.

use std::sync::Arc;

use crate::session::traits::{BrowserSession, ElementState, Key, Locator};
use crate::wait::Waiter;
use crate::Result;

/// Element handle bound to a session
#[derive(Debug, Clone)]
pub struct ElementHandle {
    session: Arc<dyn BrowserSession>,
    locator: Locator,
}

impl ElementHandle {
    /// Bind a locator to a session
    pub fn new(session: Arc<dyn BrowserSession>, locator: Locator) -> Self {
        Self { session, locator }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn session(&self) -> &Arc<dyn BrowserSession> {
        &self.session
    }

    /// True when at least one element matches
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.session.count(&self.locator).await? > 0)
    }

    pub async fn state(&self) -> Result<ElementState> {
        self.session.element_state(&self.locator).await
    }

    pub async fn is_displayed(&self) -> Result<bool> {
        Ok(self.state().await?.displayed)
    }

    pub async fn text(&self) -> Result<String> {
        self.session.text(&self.locator).await
    }

    pub async fn click(&self) -> Result<()> {
        self.session.click(&self.locator).await
    }

    pub async fn send_keys(&self, text: &str) -> Result<()> {
        self.session.send_keys(&self.locator, text).await
    }

    pub async fn press_key(&self, key: Key) -> Result<()> {
        self.session.press_key(&self.locator, key).await
    }

    /// Wait until the element is displayed
    pub async fn wait_visible(&self, waiter: &Waiter) -> Result<()> {
        waiter.visibility(self.session.as_ref(), &self.locator).await
    }

    /// Wait until the element is displayed and enabled
    pub async fn wait_clickable(&self, waiter: &Waiter) -> Result<()> {
        waiter.clickability(self.session.as_ref(), &self.locator).await
    }

    /// Wait until the element's text differs from `previous`
    pub async fn wait_text_change(&self, waiter: &Waiter, previous: &str) -> Result<String> {
        waiter
            .text_change(self.session.as_ref(), &self.locator, previous)
            .await
    }
}
