//! Suite runner
//!
//! Acquires one driver per suite, navigates to `webUrl`, runs the suite's
//! scenarios in order and always releases the driver, whether scenarios
//! pass, fail or panic.

use chrono::Local;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};

use crate::driver::{Driver, DriverProvider};
use crate::error::{Error, Result};
use crate::parameters::{self, ParametersProvider};
use crate::scenarios::{Scenario, ScenarioContext, Suite};
use crate::session::BrowserSession;
use crate::wait::Waiter;

/// Exit code for failures before any scenario ran
pub const SETUP_FAILURE_EXIT_CODE: i32 = 2;

/// Runner options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Run only the scenario with this name
    pub scenario: Option<String>,
    /// Browser to drive; falls back to the `browserName` parameter
    pub browser: Option<String>,
    /// Where failure screenshots go; `None` disables them
    pub artifact_dir: Option<PathBuf>,
    /// Timeout and polling interval of page actions
    pub waiter: Waiter,
}

/// How a scenario ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed {
        kind: &'static str,
        message: String,
        screenshot: Option<PathBuf>,
    },
    Panicked {
        message: String,
        screenshot: Option<PathBuf>,
    },
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

/// Result of one scenario
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub suite: &'static str,
    pub scenario: &'static str,
    pub outcome: Outcome,
    pub duration: Duration,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{}::{}", self.suite, self.scenario);
        match &self.outcome {
            Outcome::Passed => write!(f, "PASS {} ({} ms)", name, self.duration.as_millis()),
            Outcome::Failed { kind, message, .. } => {
                write!(f, "FAIL {} ({} ms): {}: {}", name, self.duration.as_millis(), kind, message)
            }
            Outcome::Panicked { message, .. } => {
                write!(f, "FAIL {} ({} ms): panic: {}", name, self.duration.as_millis(), message)
            }
        }
    }
}

/// Results of one suite
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub suite: &'static str,
    pub results: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

/// Process exit code: failed scenarios, saturated at 255
pub fn exit_code(reports: &[SuiteReport]) -> i32 {
    let failed: usize = reports.iter().map(SuiteReport::failed).sum();
    failed.min(255) as i32
}

/// Run `body` with the driver's session and quit the driver afterwards
///
/// The driver is released on every exit path; a panic in `body` is
/// re-raised after teardown.
pub async fn with_driver<T, F, Fut>(driver: Driver, body: F) -> Result<T>
where
    F: FnOnce(Arc<dyn BrowserSession>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcome = AssertUnwindSafe(body(driver.session())).catch_unwind().await;

    if let Err(e) = driver.quit().await {
        warn!("Driver teardown failed: {}", e);
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Run one suite end to end
///
/// Setup failures (missing `webUrl`, no browser, navigation error) are
/// returned as `Err`; scenario failures are recorded in the report.
pub async fn run_suite(
    suite: &'static Suite,
    provider: &dyn DriverProvider,
    params: Arc<ParametersProvider>,
    options: &RunOptions,
) -> Result<SuiteReport> {
    let web_url = params.get_property(parameters::WEB_URL)?;
    let browser_name = match &options.browser {
        Some(name) => Some(name.clone()),
        None => params.get_optional(parameters::BROWSER_NAME)?,
    };

    let scenarios: Vec<&'static Scenario> = suite
        .scenarios
        .iter()
        .filter(|s| options.scenario.as_deref().map_or(true, |name| s.name == name))
        .collect();

    if scenarios.is_empty() {
        info!("Suite {} has nothing to run", suite.name);
        return Ok(SuiteReport {
            suite: suite.name,
            results: Vec::new(),
        });
    }

    let driver = provider.create_driver(browser_name.as_deref()).await?;
    info!("Suite {} running on session {}", suite.name, driver.session().id());

    let span = info_span!("suite", name = suite.name);
    with_driver(driver, |session| {
        async move {
            session.navigate(&web_url).await?;
            let ctx = ScenarioContext::new(session, params, options.waiter);

            let mut results = Vec::with_capacity(scenarios.len());
            for scenario in scenarios {
                let report = run_scenario(suite.name, scenario, &ctx, options.artifact_dir.as_deref()).await;
                info!("{}", report);
                results.push(report);
            }

            Ok(SuiteReport {
                suite: suite.name,
                results,
            })
        }
        .instrument(span)
    })
    .await
}

/// Outcome of running several suites
#[derive(Debug)]
pub struct RunSummary {
    /// Reports of the suites that got past setup, in run order
    pub reports: Vec<SuiteReport>,
    /// Suite whose setup failed, stopping the run
    pub setup_error: Option<(&'static str, Error)>,
}

impl RunSummary {
    /// Process exit code: `SETUP_FAILURE_EXIT_CODE` after a setup error,
    /// otherwise the failed scenario count
    pub fn exit_code(&self) -> i32 {
        match self.setup_error {
            Some(_) => SETUP_FAILURE_EXIT_CODE,
            None => exit_code(&self.reports),
        }
    }
}

/// Run `suites` in order, stopping at the first setup failure
///
/// Reports of suites that already ran are kept.
pub async fn run_suites(
    suites: &[&'static Suite],
    provider: &dyn DriverProvider,
    params: Arc<ParametersProvider>,
    options: &RunOptions,
) -> RunSummary {
    let mut reports = Vec::with_capacity(suites.len());

    for suite in suites {
        match run_suite(suite, provider, Arc::clone(&params), options).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("Suite {} setup failed: {}", suite.name, e);
                return RunSummary {
                    reports,
                    setup_error: Some((suite.name, e)),
                };
            }
        }
    }

    RunSummary {
        reports,
        setup_error: None,
    }
}

async fn run_scenario(
    suite: &'static str,
    scenario: &'static Scenario,
    ctx: &ScenarioContext,
    artifact_dir: Option<&Path>,
) -> ScenarioReport {
    let started = Instant::now();
    let result = AssertUnwindSafe(scenario.run(ctx))
        .catch_unwind()
        .instrument(info_span!("scenario", name = scenario.name))
        .await;

    let outcome = match result {
        Ok(Ok(())) => Outcome::Passed,
        Ok(Err(e)) => {
            error!("{}::{} failed: {}", suite, scenario.name, e);
            Outcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
                screenshot: capture_failure(ctx.session.as_ref(), artifact_dir, suite, scenario.name).await,
            }
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("{}::{} panicked: {}", suite, scenario.name, message);
            Outcome::Panicked {
                message,
                screenshot: capture_failure(ctx.session.as_ref(), artifact_dir, suite, scenario.name).await,
            }
        }
    };

    ScenarioReport {
        suite,
        scenario: scenario.name,
        outcome,
        duration: started.elapsed(),
    }
}

/// Save a screenshot as `<suite>-<scenario>-<timestamp>.png`
async fn capture_failure(
    session: &dyn BrowserSession,
    artifact_dir: Option<&Path>,
    suite: &str,
    scenario: &str,
) -> Option<PathBuf> {
    let dir = artifact_dir?;
    let path = dir.join(format!(
        "{}-{}-{}.png",
        suite,
        scenario,
        Local::now().format("%Y%m%dT%H%M%S%.3f")
    ));

    let saved = async {
        let png = session.screenshot().await?;
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, png).await?;
        Ok::<_, Error>(())
    }
    .await;

    match saved {
        Ok(()) => {
            info!("Saved failure screenshot {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Could not save failure screenshot for {}::{}: {}", suite, scenario, e);
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
