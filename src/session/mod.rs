//! # Browser session layer
//!
//! A session is the single handle through which page objects and scenarios
//! touch a browser page: locate, read, click, type, and release.
//!
//! ## Module structure
//! - `traits`: [`BrowserSession`] and the value types around it
//! - `scripts`: page-side probe scripts used to resolve locators
//! - `page`: [`CdpSession`], a session over one CDP page target
//! - `element`: [`ElementHandle`], a locator bound to a session
//! - `mock`: [`MockSession`], an in-memory page for tests
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront_e2e::session::{BrowserSession, ElementHandle, Locator};
//!
//! # async fn example(session: Arc<dyn BrowserSession>) -> storefront_e2e::Result<()> {
//! session.navigate("https://example.com").await?;
//!
//! let heading = ElementHandle::new(session.clone(), Locator::css("heading", "h1"));
//! println!("{}", heading.text().await?);
//!
//! session.quit().await?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod scripts;
pub mod page;
pub mod element;
pub mod mock;

pub use traits::{BrowserSession, ElementState, Key, Locator, Timeouts};

pub use element::ElementHandle;
pub use page::CdpSession;

pub use mock::{Effect, MockElement, MockSession, Reaction};
