//! # Storefront E2E runner
//!
//! Runs the storefront suites against a real browser and exits with the
//! number of failed scenarios (saturated at 255). Setup failures before any
//! scenario runs exit with 2.
//!
//! ## Environment variables
//! - `STOREFRONT_CONFIG`: runtime config file (TOML)
//! - `STOREFRONT_CDP_ENDPOINT`: attach to a running browser instead of launching one
//! - `STOREFRONT_PARAM_<KEY>`: override a suite parameter such as `webUrl`
//! - `RUST_LOG`: log filter, defaults to the configured log level

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_e2e::{
    config::Config,
    driver::DriverFactory,
    parameters::ParametersProvider,
    scenarios::{all_suites, find_suite, Suite},
    suite::{run_suites, RunOptions, SETUP_FAILURE_EXIT_CODE},
    wait::Waiter,
};

#[derive(Parser, Debug)]
#[command(name = "storefront-e2e")]
#[command(about = "End-to-end UI suite for the storefront")]
#[command(version)]
struct Cli {
    /// Runtime configuration file (TOML)
    #[arg(short, long, env = "STOREFRONT_CONFIG")]
    config: Option<PathBuf>,

    /// Suite parameter file (webUrl, login, password, ...)
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Browser to drive (chrome, chromium, edge)
    #[arg(short, long)]
    browser: Option<String>,

    /// Attach to this CDP endpoint instead of launching a browser
    #[arg(long)]
    cdp_endpoint: Option<String>,

    /// Suites to run; all when omitted
    #[arg(short, long = "suite")]
    suites: Vec<String>,

    /// Run only this scenario
    #[arg(long)]
    scenario: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Do not save screenshots of failed scenarios
    #[arg(long)]
    no_screenshots: bool,

    /// List suites and scenarios, then exit
    #[arg(long)]
    list: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(&path.to_string_lossy())
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env().context("reading STOREFRONT_* environment")?,
    };

    if let Some(endpoint) = &cli.cdp_endpoint {
        config.cdp_endpoint = Some(endpoint.clone());
    }
    if let Some(params) = &cli.params {
        config.params_path = params.to_string_lossy().into_owned();
    }
    if cli.headed {
        config.headless = false;
    }

    Ok(config)
}

fn selected_suites(cli: &Cli) -> anyhow::Result<Vec<&'static Suite>> {
    if cli.suites.is_empty() {
        return Ok(all_suites().to_vec());
    }

    cli.suites
        .iter()
        .map(|name| {
            find_suite(name).with_context(|| {
                let known: Vec<_> = all_suites().iter().map(|s| s.name).collect();
                format!("unknown suite '{}' (known: {})", name, known.join(", "))
            })
        })
        .collect()
}

fn list_suites() {
    for suite in all_suites() {
        println!("{}", suite.name);
        for scenario in suite.scenarios {
            println!("  {:<32} {}", scenario.name, scenario.description);
        }
    }
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<i32> {
    let suites = selected_suites(&cli)?;

    let params = ParametersProvider::load(&config.params_path)
        .with_context(|| format!("loading parameters from {}", config.params_path))?;
    let params = Arc::new(params);

    let options = RunOptions {
        scenario: cli.scenario.clone(),
        browser: cli.browser.clone(),
        artifact_dir: (!cli.no_screenshots).then(|| PathBuf::from(&config.artifact_dir)),
        waiter: Waiter::from_config(&config),
    };
    let factory = DriverFactory::new(config);

    let summary = run_suites(&suites, &factory, params, &options).await;

    let mut total = 0;
    let mut failed = 0;
    for report in &summary.reports {
        for result in &report.results {
            println!("{}", result);
        }
        total += report.results.len();
        failed += report.failed();
    }
    println!("{} scenarios, {} passed, {} failed", total, total - failed, failed);

    if let Some((suite, e)) = summary.setup_error {
        return Err(anyhow::Error::new(e).context(format!("setting up suite '{}'", suite)));
    }

    Ok(summary.exit_code())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.list {
        list_suites();
        return;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(SETUP_FAILURE_EXIT_CODE);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Storefront E2E v{}", storefront_e2e::VERSION);

    let code = match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            SETUP_FAILURE_EXIT_CODE
        }
    };

    std::process::exit(code);
}
