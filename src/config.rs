//! Runtime configuration for the suite
//!
//! These are the runner's own knobs. The values the scenarios assert on
//! (URLs, credentials, expected titles) live in [`crate::parameters`].

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Suite configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CDP endpoint of an already running browser (e.g. "ws://localhost:9222").
    /// When unset the driver factory launches a browser itself.
    pub cdp_endpoint: Option<String>,

    /// Browser executable path
    pub chrome_path: Option<String>,

    /// Browser profile directory
    pub chrome_data_dir: Option<String>,

    /// Remote debugging port for launched browsers
    pub debugging_port: u16,

    /// Run launched browsers without a window
    pub headless: bool,

    /// Window width
    pub window_width: u32,

    /// Window height
    pub window_height: u32,

    /// Per-action wait timeout in milliseconds
    pub wait_timeout: u64,

    /// Wait polling interval in milliseconds
    pub poll_interval: u64,

    /// Page load timeout in milliseconds
    pub page_load_timeout: u64,

    /// Script execution timeout in milliseconds
    pub script_timeout: u64,

    /// How long to wait for a launched browser to open its endpoint, in milliseconds
    pub launch_timeout: u64,

    /// Key/value parameter file
    pub params_path: String,

    /// Directory for failure screenshots
    pub artifact_dir: String,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cdp_endpoint: None,
            chrome_path: None,
            chrome_data_dir: None,
            debugging_port: 9222,
            headless: true,
            window_width: 1920,
            window_height: 1080,
            wait_timeout: 5000,
            poll_interval: 100,
            page_load_timeout: 30000,
            script_timeout: 30000,
            launch_timeout: 10000,
            params_path: "storefront.toml".to_string(),
            artifact_dir: "target/ui-artifacts".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(endpoint) = env::var("STOREFRONT_CDP_ENDPOINT") {
            self.cdp_endpoint = Some(endpoint);
        }

        if let Ok(chrome_path) = env::var("STOREFRONT_CHROME_PATH") {
            self.chrome_path = Some(chrome_path);
        }

        if let Ok(data_dir) = env::var("STOREFRONT_DATA_DIR") {
            self.chrome_data_dir = Some(data_dir);
        }

        if let Ok(port) = env::var("STOREFRONT_DEBUGGING_PORT") {
            self.debugging_port = port
                .parse()
                .map_err(|_| Error::configuration("Invalid STOREFRONT_DEBUGGING_PORT"))?;
        }

        if let Ok(headless) = env::var("STOREFRONT_HEADLESS") {
            self.headless = headless
                .parse()
                .map_err(|_| Error::configuration("Invalid STOREFRONT_HEADLESS"))?;
        }

        if let Ok(width) = env::var("STOREFRONT_WINDOW_WIDTH") {
            self.window_width = width
                .parse()
                .map_err(|_| Error::configuration("Invalid STOREFRONT_WINDOW_WIDTH"))?;
        }

        if let Ok(height) = env::var("STOREFRONT_WINDOW_HEIGHT") {
            self.window_height = height
                .parse()
                .map_err(|_| Error::configuration("Invalid STOREFRONT_WINDOW_HEIGHT"))?;
        }

        if let Ok(timeout) = env::var("STOREFRONT_WAIT_TIMEOUT") {
            self.wait_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid STOREFRONT_WAIT_TIMEOUT"))?;
        }

        if let Ok(interval) = env::var("STOREFRONT_POLL_INTERVAL") {
            self.poll_interval = interval
                .parse()
                .map_err(|_| Error::configuration("Invalid STOREFRONT_POLL_INTERVAL"))?;
        }

        if let Ok(timeout) = env::var("STOREFRONT_PAGE_LOAD_TIMEOUT") {
            self.page_load_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid STOREFRONT_PAGE_LOAD_TIMEOUT"))?;
        }

        if let Ok(timeout) = env::var("STOREFRONT_SCRIPT_TIMEOUT") {
            self.script_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid STOREFRONT_SCRIPT_TIMEOUT"))?;
        }

        if let Ok(timeout) = env::var("STOREFRONT_LAUNCH_TIMEOUT") {
            self.launch_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid STOREFRONT_LAUNCH_TIMEOUT"))?;
        }

        if let Ok(path) = env::var("STOREFRONT_PARAMS") {
            self.params_path = path;
        }

        if let Ok(dir) = env::var("STOREFRONT_ARTIFACT_DIR") {
            self.artifact_dir = dir;
        }

        if let Ok(log_level) = env::var("STOREFRONT_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if self.poll_interval == 0 {
            return Err(Error::configuration("poll_interval must be positive"));
        }

        Ok(())
    }

    /// Per-action wait timeout
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout)
    }

    /// Wait polling interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    /// Page load and script timeouts as a session setting
    pub fn timeouts(&self) -> crate::session::Timeouts {
        crate::session::Timeouts {
            page_load: Duration::from_millis(self.page_load_timeout),
            script: Duration::from_millis(self.script_timeout),
        }
    }
}
