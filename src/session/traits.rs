//! Session traits
//!
//! A session is one live browser page. Everything above this layer (waits,
//! page objects, scenarios) talks to the page only through [`BrowserSession`].

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::Result;

/// Named CSS locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    name: String,
    css: String,
}

impl Locator {
    /// Create a CSS locator with a human-readable name
    pub fn css<N: Into<String>, S: Into<String>>(name: N, css: S) -> Self {
        Self {
            name: name.into(),
            css: css.into(),
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// CSS selector
    pub fn selector(&self) -> &str {
        &self.css
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.css)
    }
}

/// Page-load and script timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub page_load: Duration,
    pub script: Duration,
}

impl Timeouts {
    /// Same bound for page loads and scripts
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            page_load: timeout,
            script: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(30))
    }
}

/// Non-printable keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Tab,
    Escape,
    Backspace,
}

impl Key {
    /// DOM `key` value
    pub fn key(&self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Tab => "Tab",
            Key::Escape => "Escape",
            Key::Backspace => "Backspace",
        }
    }

    /// Windows virtual key code
    pub fn key_code(&self) -> u32 {
        match self {
            Key::Enter => 13,
            Key::Tab => 9,
            Key::Escape => 27,
            Key::Backspace => 8,
        }
    }

    /// Text the key produces, if any
    pub fn text(&self) -> Option<&'static str> {
        match self {
            Key::Enter => Some("\r"),
            Key::Tab => Some("\t"),
            Key::Escape | Key::Backspace => None,
        }
    }
}

/// Interactability of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct ElementState {
    pub displayed: bool,
    pub enabled: bool,
}

impl ElementState {
    /// Displayed and enabled
    pub fn clickable(&self) -> bool {
        self.displayed && self.enabled
    }
}

/// Browser session trait
///
/// Single-element operations resolve their locator on every call and fail
/// with `ElementNotFound` (no match) or `AmbiguousElement` (several matches).
#[async_trait]
pub trait BrowserSession: Send + Sync + fmt::Debug {
    /// Session ID
    fn id(&self) -> &str;

    /// Navigate to URL and wait for the document to load
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Current document title
    async fn title(&self) -> Result<String>;

    /// Current URL
    async fn current_url(&self) -> Result<String>;

    /// Number of elements the locator matches
    async fn count(&self, locator: &Locator) -> Result<usize>;

    /// Displayed/enabled state of the element
    async fn element_state(&self, locator: &Locator) -> Result<ElementState>;

    /// Visible text of the element, trimmed
    async fn text(&self, locator: &Locator) -> Result<String>;

    /// Click the element's centre
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Type text into the element
    async fn send_keys(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Press a non-printable key with the element focused
    async fn press_key(&self, locator: &Locator, key: Key) -> Result<()>;

    /// Set page-load and script timeouts
    async fn set_timeouts(&self, timeouts: Timeouts) -> Result<()>;

    /// Maximize the browser window
    async fn maximize_window(&self) -> Result<()>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Release the page; later calls fail with `SessionClosed`
    async fn quit(&self) -> Result<()>;

    /// Check if the session is still usable
    fn is_active(&self) -> bool;
}
