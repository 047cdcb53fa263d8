//! Bounded polling waits
//!
//! Every wait computes its deadline once, polls the page at a fixed interval
//! and never sleeps past the deadline. `ElementNotFound` while polling means
//! "not rendered yet"; any other error ends the wait immediately.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::session::{BrowserSession, Locator};
use crate::{Error, Result};

/// Polling interval used when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Per-action timeout of the storefront page objects
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Element state a wait is aiming for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    Visible,
    /// Displayed and enabled
    Clickable,
    /// Text differs from `from`
    TextChanged { from: String },
}

impl WaitCondition {
    /// Evaluate the condition once
    pub async fn is_met(&self, session: &dyn BrowserSession, target: &Locator) -> Result<bool> {
        match self {
            WaitCondition::Visible => Ok(session.element_state(target).await?.displayed),
            WaitCondition::Clickable => Ok(session.element_state(target).await?.clickable()),
            WaitCondition::TextChanged { from } => Ok(session.text(target).await? != *from),
        }
    }

    fn describe(&self, target: &Locator) -> String {
        match self {
            WaitCondition::Visible => format!("visibility of {}", target),
            WaitCondition::Clickable => format!("clickability of {}", target),
            WaitCondition::TextChanged { from } => {
                format!("text of {} to change from {:?}", target, from)
            }
        }
    }
}

/// Poll `probe` until it yields a value or `timeout` elapses
///
/// `probe` returns `Ok(Some(_))` when done and `Ok(None)` to keep polling.
/// A zero timeout checks exactly once.
pub async fn wait_until<T, F, Fut>(
    timeout: Duration,
    poll_interval: Duration,
    description: &str,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let poll_interval = poll_interval.max(Duration::from_millis(1));
    let started = Instant::now();
    let deadline = started + timeout;
    let mut last_missing: Option<String> = None;
    let mut attempts: u32 = 0;

    let timed_out = |attempts: u32, last_missing: Option<String>| {
        let mut message = format!(
            "{} not reached within {} ms ({} checks)",
            description,
            timeout.as_millis(),
            attempts
        );
        if let Some(locator) = last_missing {
            message.push_str(&format!("; last error: element not found: {}", locator));
        }
        warn!("{}", message);
        Error::timeout(message)
    };

    loop {
        attempts += 1;

        // A single check may not run past the deadline plus one interval
        let budget = deadline.saturating_duration_since(Instant::now()) + poll_interval;
        let checked = match tokio::time::timeout(budget, probe()).await {
            Ok(checked) => checked,
            Err(_) => return Err(timed_out(attempts, last_missing)),
        };

        match checked {
            Ok(Some(value)) => {
                debug!(
                    "Waited {:?} for {} ({} checks)",
                    started.elapsed(),
                    description,
                    attempts
                );
                return Ok(value);
            }
            Ok(None) => {}
            Err(Error::ElementNotFound(locator)) => last_missing = Some(locator),
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(attempts, last_missing));
        }

        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

/// Wait until `target` is displayed
pub async fn wait_visibility(
    session: &dyn BrowserSession,
    timeout: Duration,
    target: &Locator,
) -> Result<()> {
    Waiter::new(timeout).visibility(session, target).await
}

/// Wait until `target` is displayed and enabled
pub async fn wait_clickability(
    session: &dyn BrowserSession,
    timeout: Duration,
    target: &Locator,
) -> Result<()> {
    Waiter::new(timeout).clickability(session, target).await
}

/// Wait until the text of `target` differs from `previous`; returns the new text
pub async fn wait_text_change(
    session: &dyn BrowserSession,
    timeout: Duration,
    target: &Locator,
    previous: &str,
) -> Result<String> {
    Waiter::new(timeout).text_change(session, target, previous).await
}

/// Timeout and polling interval shared by a group of waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    timeout: Duration,
    poll_interval: Duration,
}

impl Waiter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.wait_timeout()).with_poll_interval(config.poll_interval())
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Generic bounded poll with this waiter's bounds
    pub async fn until<T, F, Fut>(&self, description: &str, probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        wait_until(self.timeout, self.poll_interval, description, probe).await
    }

    /// Wait until `condition` holds for `target`
    #[instrument(skip(self, session), fields(target = %target))]
    pub async fn condition(
        &self,
        session: &dyn BrowserSession,
        target: &Locator,
        condition: &WaitCondition,
    ) -> Result<()> {
        let description = condition.describe(target);
        self.until(&description, || async {
            Ok::<_, Error>(condition.is_met(session, target).await?.then_some(()))
        })
        .await
    }

    pub async fn visibility(&self, session: &dyn BrowserSession, target: &Locator) -> Result<()> {
        self.condition(session, target, &WaitCondition::Visible).await
    }

    pub async fn clickability(&self, session: &dyn BrowserSession, target: &Locator) -> Result<()> {
        self.condition(session, target, &WaitCondition::Clickable).await
    }

    /// Wait until the text of `target` differs from `previous`; returns the new text
    #[instrument(skip(self, session), fields(target = %target))]
    pub async fn text_change(
        &self,
        session: &dyn BrowserSession,
        target: &Locator,
        previous: &str,
    ) -> Result<String> {
        let description = WaitCondition::TextChanged {
            from: previous.to_string(),
        }
        .describe(target);

        self.until(&description, || async {
            let current = session.text(target).await?;
            Ok::<_, Error>((current != previous).then_some(current))
        })
        .await
    }
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Effect, MockElement, MockSession, Reaction};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn target() -> Locator {
        Locator::css("login box", ".login-box")
    }

    #[tokio::test(start_paused = true)]
    async fn test_condition_already_true_returns_without_sleeping() {
        let session = MockSession::new("Shop").with_element(".login-box", MockElement::visible(""));
        let started = Instant::now();

        wait_visibility(&session, Duration::from_secs(5), &target()).await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds() {
        let session = MockSession::new("Shop").with_element(".login-box", MockElement::hidden(""));
        let started = Instant::now();

        let err = wait_visibility(&session, Duration::from_secs(5), &target()).await.unwrap_err();

        let elapsed = started.elapsed();
        assert!(matches!(err, Error::Timeout(_)));
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed <= Duration::from_secs(5) + DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_never_overshoots_odd_interval() {
        let session = MockSession::new("Shop").with_element(".login-box", MockElement::hidden(""));
        let waiter = Waiter::new(Duration::from_millis(250)).with_poll_interval(Duration::from_millis(100));
        let started = Instant::now();

        assert!(waiter.visibility(&session, &target()).await.is_err());
        assert_eq!(started.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_checks_once() {
        let checks = AtomicU32::new(0);
        let result: Result<()> = wait_until(Duration::ZERO, DEFAULT_POLL_INTERVAL, "nothing", || async {
            checks.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(None)
        })
        .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_check_cannot_outlast_deadline() {
        let timeout = Duration::from_millis(500);
        let poll = Duration::from_millis(100);
        let started = Instant::now();

        let result: Result<()> = wait_until(timeout, poll, "slow page", || async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok::<_, Error>(None)
        })
        .await;

        let elapsed = started.elapsed();
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(elapsed >= timeout);
        assert!(elapsed <= timeout + poll);
    }

    #[tokio::test(start_paused = true)]
    async fn test_element_appearing_late_is_found() {
        let session = MockSession::new("Shop")
            .with_element("#open", MockElement::visible("open"))
            .on_click(
                "#open",
                Reaction::after(Duration::from_millis(1200), Effect::Put(".login-box".into(), MockElement::visible(""))),
            );
        session.click(&Locator::css("open", "#open")).await.unwrap();
        let started = Instant::now();

        wait_visibility(&session, Duration::from_secs(5), &target()).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1200));
        assert!(elapsed <= Duration::from_millis(1300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_element_is_quoted_in_timeout() {
        let session = MockSession::new("Shop");

        let err = wait_visibility(&session, Duration::from_millis(300), &target()).await.unwrap_err();

        match err {
            Error::Timeout(message) => {
                assert!(message.contains("visibility of login box (.login-box)"));
                assert!(message.contains("element not found"));
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ambiguous_element_fails_fast() {
        let session = MockSession::new("Shop")
            .with_element(".login-box", MockElement::visible(""))
            .with_element(".login-box", MockElement::visible(""));
        let started = Instant::now();

        let err = wait_visibility(&session, Duration::from_secs(5), &target()).await.unwrap_err();

        assert!(matches!(err, Error::AmbiguousElement { count: 2, .. }));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clickability_waits_for_enabled() {
        let session = MockSession::new("Shop")
            .with_element("#open", MockElement::visible("open"))
            .with_element(".login-box", MockElement::visible("").disabled())
            .on_click("#open", Reaction::after(Duration::from_millis(400), Effect::Enable(".login-box".into())));

        assert!(wait_visibility(&session, Duration::ZERO, &target()).await.is_ok());
        assert!(wait_clickability(&session, Duration::from_millis(200), &target()).await.is_err());

        session.click(&Locator::css("open", "#open")).await.unwrap();
        wait_clickability(&session, Duration::from_secs(1), &target()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_change_returns_new_text() {
        let session = MockSession::new("Shop")
            .with_element("#buy", MockElement::visible("buy"))
            .with_element("#itogCount", MockElement::visible("2"))
            .on_click("#buy", Reaction::after(Duration::from_millis(500), Effect::Increment("#itogCount".into())));
        let counter = Locator::css("cart count", "#itogCount");

        session.click(&Locator::css("buy", "#buy")).await.unwrap();
        let text = wait_text_change(&session, Duration::from_secs(5), &counter, "2").await.unwrap();

        assert_eq!(text, "3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_change_times_out_when_unchanged() {
        let session = MockSession::new("Shop").with_element("#itogCount", MockElement::visible("2"));
        let counter = Locator::css("cart count", "#itogCount");

        let err = wait_text_change(&session, Duration::from_secs(1), &counter, "2").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[test]
    fn test_waiter_from_config() {
        let config = Config::default();
        let waiter = Waiter::from_config(&config);
        assert_eq!(waiter.timeout(), Duration::from_secs(5));
        assert_eq!(waiter.poll_interval(), Duration::from_millis(100));
    }
}
