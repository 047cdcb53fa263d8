//! Driver factory
//!
//! Produces a ready [`Driver`]: either attached to a browser that already
//! exposes a CDP endpoint, or to a Chromium-family browser this module
//! launches with remote debugging enabled. A launched browser lives exactly
//! as long as its driver.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::cdp::{CdpBrowser, CdpBrowserImpl};
use crate::config::Config;
use crate::session::{BrowserSession, CdpSession};
use crate::wait::wait_until;
use crate::{Error, Result};

/// Browsers the factory can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserKind {
    #[default]
    Chrome,
    Chromium,
    Edge,
}

impl BrowserKind {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Chromium => "chromium",
            BrowserKind::Edge => "edge",
        }
    }

    /// Executable names searched on `PATH`, most specific first
    fn executables(&self) -> &'static [&'static str] {
        match self {
            BrowserKind::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
            BrowserKind::Chromium => &["chromium", "chromium-browser"],
            BrowserKind::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
        }
    }
}

impl FromStr for BrowserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chrome" | "google-chrome" | "googlechrome" => Ok(BrowserKind::Chrome),
            "chromium" => Ok(BrowserKind::Chromium),
            "edge" | "msedge" | "microsoft-edge" => Ok(BrowserKind::Edge),
            other => Err(Error::configuration(format!(
                "Unsupported browser '{}': only Chromium-family browsers (chrome, chromium, edge) speak CDP",
                other
            ))),
        }
    }
}

/// Locate an executable on `PATH`
fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Browser process started by the factory
///
/// The process is killed when this value is dropped.
#[derive(Debug)]
pub struct BrowserProcess {
    child: Child,
    endpoint: String,
    /// Profile directory created for this process, removed on kill
    temp_profile: Option<PathBuf>,
}

impl BrowserProcess {
    /// Start the browser and wait until its DevTools endpoint answers
    pub async fn launch(kind: BrowserKind, config: &Config) -> Result<Self> {
        let executable = match &config.chrome_path {
            Some(path) => PathBuf::from(path),
            None => find_on_path(kind.executables()).ok_or_else(|| {
                Error::browser_launch(format!(
                    "No {} executable found on PATH (tried {}); set STOREFRONT_CHROME_PATH",
                    kind.name(),
                    kind.executables().join(", ")
                ))
            })?,
        };

        let (profile, temp_profile) = match &config.chrome_data_dir {
            Some(dir) => (PathBuf::from(dir), None),
            None => {
                let dir = std::env::temp_dir().join(format!("storefront-e2e-{}", uuid::Uuid::new_v4()));
                (dir.clone(), Some(dir))
            }
        };
        std::fs::create_dir_all(&profile)?;

        let args = Self::arguments(config, &profile);
        info!("Launching {} ({})", kind.name(), executable.display());
        debug!("Browser arguments: {:?}", args);

        let child = Command::new(&executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::browser_launch(format!("Failed to start {}: {}", executable.display(), e))
            })?;

        let mut process = Self {
            child,
            endpoint: format!("http://127.0.0.1:{}", config.debugging_port),
            temp_profile,
        };

        process
            .wait_ready(Duration::from_millis(config.launch_timeout), config.poll_interval())
            .await?;

        info!("Browser endpoint ready at {}", process.endpoint);
        Ok(process)
    }

    fn arguments(config: &Config, profile: &Path) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", config.debugging_port),
            format!("--user-data-dir={}", profile.display()),
            format!("--window-size={},{}", config.window_width, config.window_height),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-gpu".to_string(),
        ];
        if config.headless {
            args.push("--headless=new".to_string());
        }
        args.push("about:blank".to_string());
        args
    }

    async fn wait_ready(&mut self, timeout: Duration, poll_interval: Duration) -> Result<()> {
        let probe = CdpBrowserImpl::new(self.endpoint.clone());
        let child = &mut self.child;

        wait_until(timeout, poll_interval, "browser DevTools endpoint", || {
            let exited = child.try_wait();
            let probe = &probe;
            async move {
                match exited {
                    Ok(Some(status)) => {
                        return Err(Error::browser_launch(format!(
                            "Browser exited during startup with {}",
                            status
                        )))
                    }
                    Err(e) => return Err(Error::Io(e)),
                    Ok(None) => {}
                }
                Ok(probe.get_version().await.ok().map(|_| ()))
            }
        })
        .await
        .map_err(|e| match e {
            Error::Timeout(message) => Error::browser_launch(message),
            other => other,
        })
    }

    /// DevTools endpoint of the process
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Kill the process and remove its temporary profile
    pub async fn kill(&mut self) -> Result<()> {
        if self.child.try_wait()?.is_none() {
            self.child.kill().await?;
        }
        if let Some(dir) = self.temp_profile.take() {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                debug!("Failed to remove profile {}: {}", dir.display(), e);
            }
        }
        Ok(())
    }
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        if let Some(dir) = self.temp_profile.take() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

/// A browser session plus whatever keeps it alive
#[derive(Debug)]
pub struct Driver {
    kind: BrowserKind,
    session: Arc<dyn BrowserSession>,
    browser: Option<Arc<dyn CdpBrowser>>,
    process: Option<BrowserProcess>,
}

impl Driver {
    /// Wrap a session that owns no browser resources
    pub fn from_session(session: Arc<dyn BrowserSession>) -> Self {
        Self {
            kind: BrowserKind::default(),
            session,
            browser: None,
            process: None,
        }
    }

    pub fn session(&self) -> Arc<dyn BrowserSession> {
        Arc::clone(&self.session)
    }

    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    /// True when the factory launched the browser behind this driver
    pub fn owns_process(&self) -> bool {
        self.process.is_some()
    }

    /// Quit the session, close browser connections and kill a launched browser
    ///
    /// Every step runs; the first failure is returned.
    pub async fn quit(mut self) -> Result<()> {
        let mut first_error = None;

        if let Err(e) = self.session.quit().await {
            warn!("Failed to quit session {}: {}", self.session.id(), e);
            first_error.get_or_insert(e);
        }

        if let Some(browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser connections: {}", e);
                first_error.get_or_insert(e);
            }
        }

        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill().await {
                warn!("Failed to kill browser process: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Source of drivers for the suite runner
#[async_trait]
pub trait DriverProvider: Send + Sync {
    /// Create a driver for `browser_name`, or the default browser
    async fn create_driver(&self, browser_name: Option<&str>) -> Result<Driver>;
}

/// Driver factory backed by CDP
#[derive(Debug, Clone)]
pub struct DriverFactory {
    config: Config,
}

impl DriverFactory {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a page on `browser` and apply the configured timeouts
    pub async fn attach(&self, browser: Arc<dyn CdpBrowser>) -> Result<Arc<dyn BrowserSession>> {
        let viewport = (self.config.window_width, self.config.window_height);
        let session = CdpSession::open(browser, viewport).await?;
        session.set_timeouts(self.config.timeouts()).await?;
        Ok(Arc::new(session))
    }
}

#[async_trait]
impl DriverProvider for DriverFactory {
    async fn create_driver(&self, browser_name: Option<&str>) -> Result<Driver> {
        let kind = browser_name
            .map(BrowserKind::from_str)
            .transpose()?
            .unwrap_or_default();

        let (endpoint, process) = match &self.config.cdp_endpoint {
            Some(endpoint) => {
                info!("Attaching to {} at {}", kind.name(), endpoint);
                (endpoint.clone(), None)
            }
            None => {
                let process = BrowserProcess::launch(kind, &self.config).await?;
                (process.endpoint().to_string(), Some(process))
            }
        };

        let browser: Arc<dyn CdpBrowser> = Arc::new(CdpBrowserImpl::new(endpoint));
        let session = self.attach(Arc::clone(&browser)).await?;

        Ok(Driver {
            kind,
            session,
            browser: Some(browser),
            process,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::MockCdpBrowser;
    use crate::session::MockSession;

    #[test]
    fn test_browser_kind_parsing() {
        assert_eq!("Chrome".parse::<BrowserKind>().unwrap(), BrowserKind::Chrome);
        assert_eq!(" chromium ".parse::<BrowserKind>().unwrap(), BrowserKind::Chromium);
        assert_eq!("msedge".parse::<BrowserKind>().unwrap(), BrowserKind::Edge);

        let err = "firefox".parse::<BrowserKind>().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("firefox"));
    }

    #[test]
    fn test_launch_arguments() {
        let config = Config {
            debugging_port: 9333,
            window_width: 1280,
            window_height: 800,
            ..Config::default()
        };

        let args = BrowserProcess::arguments(&config, Path::new("/tmp/profile"));

        assert!(args.contains(&"--remote-debugging-port=9333".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--window-size=1280,800".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_headed_launch_has_no_headless_flag() {
        let config = Config {
            headless: false,
            ..Config::default()
        };
        let args = BrowserProcess::arguments(&config, Path::new("/tmp/profile"));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }

    #[tokio::test]
    async fn test_attach_opens_page_with_timeouts() {
        let factory = DriverFactory::new(Config::default());
        let browser = Arc::new(MockCdpBrowser::new());

        let session = factory.attach(browser.clone()).await.unwrap();

        assert!(session.is_active());
        assert_eq!(browser.connections().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_browser_fails_before_launch() {
        let factory = DriverFactory::new(Config::default());
        let err = factory.create_driver(Some("firefox")).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let factory = DriverFactory::new(Config {
            cdp_endpoint: Some("http://127.0.0.1:1".to_string()),
            ..Config::default()
        });

        let err = factory.create_driver(None).await.unwrap_err();
        assert!(matches!(err, Error::BrowserLaunch(_)));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let factory = DriverFactory::new(Config {
            chrome_path: Some("/nonexistent/storefront-e2e/chrome".to_string()),
            chrome_data_dir: Some(std::env::temp_dir().join("storefront-e2e-missing").display().to_string()),
            ..Config::default()
        });

        let err = factory.create_driver(None).await.unwrap_err();
        assert!(matches!(err, Error::BrowserLaunch(_)));
    }

    #[tokio::test]
    async fn test_quit_releases_session() {
        let mock = Arc::new(MockSession::new("Shop"));
        let driver = Driver::from_session(mock.clone());
        assert!(!driver.owns_process());

        driver.quit().await.unwrap();

        assert!(!mock.is_active());
        assert_eq!(mock.quit_count(), 1);
    }
}
