//! Unified error types for storefront-e2e

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for storefront-e2e
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A wait condition did not hold before its deadline
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Locator matched no element
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Locator matched more than one element
    #[error("Ambiguous element: {locator} matched {count} elements")]
    AmbiguousElement { locator: String, count: usize },

    /// Parameter lookup failed
    #[error("Configuration key missing: {0}")]
    ConfigKeyMissing(String),

    /// Expected and actual values differ
    #[error("Assertion failed: expected {expected:?}, got {actual:?}")]
    AssertionFailed { expected: String, actual: String },

    /// Page text could not be interpreted
    #[error("Unexpected text in {locator}: {text:?}")]
    UnexpectedText { locator: String, text: String },

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// Browser process could not be started or reached
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Session already quit
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new element not found error
    pub fn element_not_found<S: Into<String>>(locator: S) -> Self {
        Error::ElementNotFound(locator.into())
    }

    /// Create a new ambiguous element error
    pub fn ambiguous_element<S: Into<String>>(locator: S, count: usize) -> Self {
        Error::AmbiguousElement {
            locator: locator.into(),
            count,
        }
    }

    /// Create a new missing configuration key error
    pub fn config_key_missing<S: Into<String>>(key: S) -> Self {
        Error::ConfigKeyMissing(key.into())
    }

    /// Create a new assertion failure
    pub fn assertion_failed<E: Into<String>, A: Into<String>>(expected: E, actual: A) -> Self {
        Error::AssertionFailed {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new unexpected text error
    pub fn unexpected_text<L: Into<String>, T: Into<String>>(locator: L, text: T) -> Self {
        Error::UnexpectedText {
            locator: locator.into(),
            text: text.into(),
        }
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new browser launch error
    pub fn browser_launch<S: Into<String>>(msg: S) -> Self {
        Error::BrowserLaunch(msg.into())
    }

    /// Create a new session closed error
    pub fn session_closed<S: Into<String>>(id: S) -> Self {
        Error::SessionClosed(id.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Short, stable name of the error kind, used in scenario reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "IoError",
            Error::WebSocket(_) => "WebSocket",
            Error::Cdp(_) => "Cdp",
            Error::Serialization(_) => "Serialization",
            Error::Timeout(_) => "Timeout",
            Error::ElementNotFound(_) => "ElementNotFound",
            Error::AmbiguousElement { .. } => "AmbiguousElement",
            Error::ConfigKeyMissing(_) => "ConfigKeyMissing",
            Error::AssertionFailed { .. } => "AssertionFailure",
            Error::UnexpectedText { .. } => "UnexpectedText",
            Error::ScriptExecutionFailed(_) => "ScriptExecutionFailed",
            Error::BrowserLaunch(_) => "BrowserLaunch",
            Error::SessionClosed(_) => "SessionClosed",
            Error::Configuration(_) => "Configuration",
            Error::Internal(_) => "Internal",
        }
    }
}
