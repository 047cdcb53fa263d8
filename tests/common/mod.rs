//! Common test utilities
//!
//! Shared fixtures for the integration tests: suite parameters, a driver
//! provider handing out in-memory storefront sessions, and helpers to find a
//! live browser.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use storefront_e2e::cdp::{CdpBrowser, CdpBrowserImpl};
use storefront_e2e::driver::{Driver, DriverProvider};
use storefront_e2e::parameters::{self, ParametersProvider};
use storefront_e2e::session::MockSession;
use storefront_e2e::{Error, Result};

pub const STORE_TITLE: &str = "Интернет-магазин электроники";

/// Parameters matching the in-memory storefront
pub fn storefront_params() -> Arc<ParametersProvider> {
    params_with(&[])
}

/// Storefront parameters with some keys replaced or removed (empty value)
pub fn params_with(overrides: &[(&str, &str)]) -> Arc<ParametersProvider> {
    let defaults = [
        (parameters::WEB_URL, "https://shop.example.test/"),
        (parameters::CORRECT_TITLE, STORE_TITLE),
        (parameters::WRONG_TITLE, "Совсем другой магазин"),
        (parameters::LOGIN, "nobody@example.test"),
        (parameters::PASSWORD, "not-a-password"),
        (parameters::SEARCH_QUERY, "ноутбук"),
    ];

    let pairs = defaults
        .iter()
        .map(|(key, value)| {
            let value = overrides
                .iter()
                .find(|(k, _)| k == key)
                .map_or(*value, |(_, v)| *v);
            (*key, value)
        })
        .filter(|(_, value)| !value.is_empty());

    Arc::new(ParametersProvider::from_pairs(pairs).expect("valid parameters"))
}

/// Driver provider backed by `MockSession::storefront`
#[derive(Default)]
pub struct MockDriverProvider {
    sessions: Mutex<Vec<Arc<MockSession>>>,
    browser_names: Mutex<Vec<Option<String>>>,
    /// Calls that succeed before every later call fails
    fail_with: Option<(usize, fn() -> Error)>,
}

impl MockDriverProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose every `create_driver` call fails
    pub fn failing(error: fn() -> Error) -> Self {
        Self::failing_after(0, error)
    }

    /// Provider whose first `successes` calls work and the rest fail
    pub fn failing_after(successes: usize, error: fn() -> Error) -> Self {
        Self {
            fail_with: Some((successes, error)),
            ..Self::default()
        }
    }

    /// Sessions handed out so far
    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().unwrap().clone()
    }

    /// Browser names requested so far
    pub fn browser_names(&self) -> Vec<Option<String>> {
        self.browser_names.lock().unwrap().clone()
    }
}

#[async_trait]
impl DriverProvider for MockDriverProvider {
    async fn create_driver(&self, browser_name: Option<&str>) -> Result<Driver> {
        let calls = {
            let mut names = self.browser_names.lock().unwrap();
            names.push(browser_name.map(str::to_string));
            names.len()
        };

        if let Some((successes, error)) = self.fail_with {
            if calls > successes {
                return Err(error());
            }
        }

        let session = Arc::new(MockSession::storefront(STORE_TITLE));
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(Driver::from_session(session))
    }
}

/// Get Chrome debugging URL from environment or use default
pub fn chrome_url() -> String {
    std::env::var("CHROME_DEBUG_URL").unwrap_or_else(|_| "ws://localhost:9222".to_string())
}

/// Check if a browser answers on the debugging URL
pub async fn is_chrome_available() -> bool {
    CdpBrowserImpl::new(chrome_url()).get_version().await.is_ok()
}
