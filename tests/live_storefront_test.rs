//! Live browser tests
//!
//! Run both suites in a real browser against a local fixture page that mimics
//! the storefront header. Skipped unless a browser answers on
//! `CHROME_DEBUG_URL` (default `ws://localhost:9222`).

mod common;

use std::sync::Arc;

use common::{chrome_url, is_chrome_available};
use storefront_e2e::config::Config;
use storefront_e2e::driver::{DriverFactory, DriverProvider};
use storefront_e2e::pages::StartPage;
use storefront_e2e::parameters::{self, ParametersProvider};
use storefront_e2e::scenarios::{LOGIN_ERROR_MESSAGE, START_PAGE_SUITE, TITLE_SUITE};
use storefront_e2e::suite::{run_suite, RunOptions};

const FIXTURE_TITLE: &str = "Fixture Store";

fn fixture_url() -> String {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
  <input class="input-search">
  <button class="authorization login-button" onclick="document.querySelector('.login-box').style.display = 'block'">Вход</button>
  <div class="login-box logout-box" style="display: none">
    <input name="login">
    <input name="password" type="password">
    <button id="signIn2" onclick="setTimeout(() => document.querySelector('.login-error').style.display = 'block', 200)">Войти</button>
    <div class="login-error" style="display: none">{error}</div>
  </div>
  <div class="search-block-name" style="display: none">
    <div class="search-word">РЕЗУЛЬТАТЫ ПОИСКА НАЙДЕНО:</div>
    <div class="search-block"><ul><li><div>
      <button class="add-to-cart buy" onclick="setTimeout(() => {{ const c = document.getElementById('itogCount'); c.textContent = String(Number(c.textContent) + 1); }}, 200)">В корзину</button>
    </div></li></ul></div>
  </div>
  <span id="itogCount">0</span>
  <script>
    document.querySelector('.input-search').addEventListener('keydown', (e) => {{
      if (e.key === 'Enter') setTimeout(() => document.querySelector('.search-block-name').style.display = 'block', 200);
    }});
  </script>
</body>
</html>"#,
        title = FIXTURE_TITLE,
        error = LOGIN_ERROR_MESSAGE,
    );
    format!("data:text/html;charset=utf-8,{}", urlencoding::encode(&html))
}

fn fixture_params() -> Arc<ParametersProvider> {
    let url = fixture_url();
    Arc::new(
        ParametersProvider::from_pairs([
            (parameters::WEB_URL, url.as_str()),
            (parameters::CORRECT_TITLE, FIXTURE_TITLE),
            (parameters::WRONG_TITLE, "Some Other Store"),
            (parameters::LOGIN, "nobody@example.test"),
            (parameters::PASSWORD, "not-a-password"),
            (parameters::SEARCH_QUERY, "ноутбук"),
        ])
        .unwrap(),
    )
}

fn factory() -> DriverFactory {
    DriverFactory::new(Config {
        cdp_endpoint: Some(chrome_url()),
        ..Config::default()
    })
}

#[tokio::test]
async fn test_live_start_page_suite() {
    if !is_chrome_available().await {
        eprintln!("Skipping: no browser at {}", chrome_url());
        return;
    }

    let report = run_suite(&START_PAGE_SUITE, &factory(), fixture_params(), &RunOptions::default())
        .await
        .unwrap();

    let lines: Vec<String> = report.results.iter().map(ToString::to_string).collect();
    assert_eq!(report.failed(), 0, "{:#?}", lines);
}

#[tokio::test]
async fn test_live_title_suite() {
    if !is_chrome_available().await {
        eprintln!("Skipping: no browser at {}", chrome_url());
        return;
    }

    let report = run_suite(&TITLE_SUITE, &factory(), fixture_params(), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 1);
}

#[tokio::test]
async fn test_live_cart_counter() {
    if !is_chrome_available().await {
        eprintln!("Skipping: no browser at {}", chrome_url());
        return;
    }

    let driver = factory().create_driver(None).await.unwrap();
    let session = driver.session();
    session.navigate(&fixture_url()).await.unwrap();

    let page = StartPage::new(session).await.unwrap();
    assert_eq!(page.title().await.unwrap(), FIXTURE_TITLE);
    assert_eq!(page.get_cart_count().await.unwrap(), 0);
    page.click_add_to_cart_button("ноутбук").await.unwrap();
    assert_eq!(page.get_cart_count().await.unwrap(), 1);

    driver.quit().await.unwrap();
}
