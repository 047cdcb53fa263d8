//! # Chrome DevTools Protocol (CDP) layer
//!
//! WebSocket transport and typed client for the handful of CDP commands the
//! suite drives a browser with.
//!
//! ## Module structure
//! - `traits`: connection, client and browser seams
//! - `types`: wire structures
//! - `connection`: WebSocket connection with a background reader
//! - `client`: typed client (navigate, evaluate, screenshot, raw calls)
//! - `browser`: DevTools HTTP endpoints and target management
//! - `mock`: in-memory connection and browser for tests
//!
//! ## Usage
//! ```rust,no_run
//! use storefront_e2e::cdp::{CdpBrowser, CdpBrowserImpl};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let browser = CdpBrowserImpl::new("ws://localhost:9222");
//! let target = browser.create_target("about:blank").await?;
//! let client = browser.create_client(&target.ws_url).await?;
//!
//! let result = client.navigate("https://example.com").await?;
//! println!("Navigated to: {}", result.url);
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod types;
pub mod connection;
pub mod client;
pub mod browser;
pub mod mock;

#[cfg(test)]
mod tests;

pub use traits::{
    BrowserVersion, CdpBrowser, CdpClient, CdpConnection, CdpError, CdpResponse,
    EvaluationResult, NavigationResult, ScreenshotFormat, TargetInfo,
};

pub use browser::CdpBrowserImpl;
pub use client::CdpClientImpl;
pub use connection::CdpWebSocketConnection;

pub use mock::{MockCdpBrowser, MockCdpConnection};
