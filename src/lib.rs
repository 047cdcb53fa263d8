//! Storefront E2E: end-to-end UI suite for the storefront web shop
//!
//! Drives a Chromium-family browser over the Chrome DevTools Protocol through
//! page objects, bounded waits and a small scenario runner.

pub mod error;
pub mod config;
pub mod parameters;

pub mod cdp;
pub mod session;
pub mod wait;
pub mod driver;
pub mod pages;
pub mod scenarios;
pub mod suite;

// Re-exports
pub use error::{Error, Result};

/// Storefront E2E library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
