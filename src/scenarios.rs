//! Storefront scenarios
//!
//! A scenario is a plain async function over a [`ScenarioContext`]. The
//! context hands it the session and the parameters by reference; scenarios
//! never own or release the session themselves.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::info;

use crate::error::{Error, Result};
use crate::pages::StartPage;
use crate::parameters::{self, ParametersProvider};
use crate::session::BrowserSession;
use crate::wait::Waiter;

/// Error text shown for rejected credentials
pub const LOGIN_ERROR_MESSAGE: &str = "Проверьте правильность введенных данных либо зарегистрируйтесь";

/// Suffix of the search result header
pub const SEARCH_RESULT_SUFFIX: &str = "НАЙДЕНО:";

/// Fail with `AssertionFailed` unless `expected == actual`
pub fn ensure_eq<T: PartialEq + Debug>(expected: T, actual: T) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::assertion_failed(format!("{:?}", expected), format!("{:?}", actual)))
    }
}

/// Fail with `AssertionFailed` unless `actual` ends with `suffix`
pub fn ensure_ends_with<S: AsRef<str>>(actual: S, suffix: &str) -> Result<()> {
    if actual.as_ref().ends_with(suffix) {
        Ok(())
    } else {
        Err(Error::assertion_failed(format!("text ending with {:?}", suffix), format!("{:?}", actual.as_ref())))
    }
}

/// What a running scenario can reach
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub session: Arc<dyn BrowserSession>,
    pub params: Arc<ParametersProvider>,
    pub waiter: Waiter,
}

impl ScenarioContext {
    pub fn new(session: Arc<dyn BrowserSession>, params: Arc<ParametersProvider>, waiter: Waiter) -> Self {
        Self { session, params, waiter }
    }

    /// Start page bound to this context's session
    pub async fn start_page(&self) -> Result<StartPage> {
        StartPage::with_waiter(Arc::clone(&self.session), self.waiter).await
    }

    pub fn param(&self, key: &str) -> Result<String> {
        self.params.get_property(key)
    }
}

pub type ScenarioFn = for<'a> fn(&'a ScenarioContext) -> BoxFuture<'a, Result<()>>;

/// Named scenario
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    run: ScenarioFn,
}

impl Scenario {
    pub const fn new(name: &'static str, description: &'static str, run: ScenarioFn) -> Self {
        Self { name, description, run }
    }

    pub fn run<'a>(&self, ctx: &'a ScenarioContext) -> BoxFuture<'a, Result<()>> {
        (self.run)(ctx)
    }
}

impl Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Scenarios sharing one session, run in order
#[derive(Debug)]
pub struct Suite {
    pub name: &'static str,
    pub scenarios: &'static [Scenario],
}

impl Suite {
    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }
}

pub static TITLE_SUITE: Suite = Suite {
    name: "title",
    scenarios: &[
        Scenario::new(
            "check_correct_main_page_title",
            "main page title equals correctTitle",
            check_correct_main_page_title,
        ),
        Scenario::new(
            "check_wrong_main_page_title",
            "main page title equals wrongTitle (expected to fail)",
            check_wrong_main_page_title,
        ),
    ],
};

pub static START_PAGE_SUITE: Suite = Suite {
    name: "start_page",
    scenarios: &[
        Scenario::new("auth_test", "invalid credentials show the login error", auth_test),
        Scenario::new("search_test", "search shows the result header", search_test),
        Scenario::new("add_to_cart_test", "adding to the cart increments the counter", add_to_cart_test),
        Scenario::new("check_page_title", "reading the title twice gives the same value", check_page_title),
    ],
};

/// Every suite, in run order
pub fn all_suites() -> [&'static Suite; 2] {
    [&TITLE_SUITE, &START_PAGE_SUITE]
}

pub fn find_suite(name: &str) -> Option<&'static Suite> {
    all_suites().into_iter().find(|s| s.name == name)
}

fn check_title<'a>(ctx: &'a ScenarioContext, key: &'static str) -> BoxFuture<'a, Result<()>> {
    async move {
        let expected = ctx.param(key)?;
        let page = ctx.start_page().await?;
        let actual = page.title().await?;
        info!("Page title: {}", actual);
        ensure_eq(expected, actual)
    }
    .boxed()
}

fn check_correct_main_page_title(ctx: &ScenarioContext) -> BoxFuture<'_, Result<()>> {
    check_title(ctx, parameters::CORRECT_TITLE)
}

fn check_wrong_main_page_title(ctx: &ScenarioContext) -> BoxFuture<'_, Result<()>> {
    check_title(ctx, parameters::WRONG_TITLE)
}

fn auth_test(ctx: &ScenarioContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let login = ctx.param(parameters::LOGIN)?;
        let password = ctx.param(parameters::PASSWORD)?;
        let page = ctx.start_page().await?;

        let message = page
            .click_auth_button()
            .await?
            .check_auth(&login, &password)
            .await?;
        ensure_eq(LOGIN_ERROR_MESSAGE, message.as_str())
    }
    .boxed()
}

fn search_test(ctx: &ScenarioContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let query = ctx.param(parameters::SEARCH_QUERY)?;
        let page = ctx.start_page().await?;

        let text = page.get_search_result_text(&query).await?;
        ensure_ends_with(text, SEARCH_RESULT_SUFFIX)
    }
    .boxed()
}

fn add_to_cart_test(ctx: &ScenarioContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let query = ctx.param(parameters::SEARCH_QUERY)?;
        let page = ctx.start_page().await?;

        let before = page.get_cart_count().await?;
        let after = page
            .click_add_to_cart_button(&query)
            .await?
            .get_cart_count()
            .await?;
        ensure_eq(before + 1, after)
    }
    .boxed()
}

fn check_page_title(ctx: &ScenarioContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let page = ctx.start_page().await?;
        let first = page.title().await?;
        let second = page.title().await?;
        ensure_eq(first, second)
    }
    .boxed()
}
