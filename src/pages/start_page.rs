//! Storefront start page
//!
//! Locators and user actions of the landing page: login form, product
//! search and the cart counter in the header.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::session::{BrowserSession, ElementHandle, Key, Locator, Timeouts};
use crate::wait::Waiter;

/// CSS selectors of the start page
pub mod locators {
    pub const SEARCH_INPUT: &str = ".input-search";
    pub const AUTH_BUTTON: &str = ".authorization.login-button";
    pub const LOGIN_BOX: &str = ".login-box.logout-box";
    pub const LOGIN_FIELD: &str = "input[name = 'login']";
    pub const PASSWORD_FIELD: &str = "input[name = 'password']";
    pub const LOGIN_BUTTON: &str = "#signIn2";
    pub const LOGIN_ERROR: &str = ".login-error";
    pub const SEARCH_RESULT: &str = ".search-word";
    /// Add-to-cart button of the first search result
    pub const ADD_TO_CART_BUTTON: &str =
        ".search-block-name>.search-block>ul>li:nth-child(1)>div>.add-to-cart.buy";
    pub const CART_COUNT: &str = "#itogCount";
}

/// Start page elements, each bound to the session
#[derive(Debug, Clone)]
pub struct StartPageElements {
    pub search_input: ElementHandle,
    pub auth_button: ElementHandle,
    pub login_box: ElementHandle,
    pub login_field: ElementHandle,
    pub password_field: ElementHandle,
    pub login_button: ElementHandle,
    pub login_error: ElementHandle,
    pub search_result: ElementHandle,
    pub add_to_cart_button: ElementHandle,
    pub cart_count: ElementHandle,
}

impl StartPageElements {
    pub fn bind(session: Arc<dyn BrowserSession>) -> Self {
        let bind = |name: &str, css: &str| ElementHandle::new(Arc::clone(&session), Locator::css(name, css));

        Self {
            search_input: bind("search input", locators::SEARCH_INPUT),
            auth_button: bind("auth button", locators::AUTH_BUTTON),
            login_box: bind("login box", locators::LOGIN_BOX),
            login_field: bind("login field", locators::LOGIN_FIELD),
            password_field: bind("password field", locators::PASSWORD_FIELD),
            login_button: bind("login button", locators::LOGIN_BUTTON),
            login_error: bind("login error", locators::LOGIN_ERROR),
            search_result: bind("search result", locators::SEARCH_RESULT),
            add_to_cart_button: bind("add-to-cart button", locators::ADD_TO_CART_BUTTON),
            cart_count: bind("cart count", locators::CART_COUNT),
        }
    }
}

/// Start page object
#[derive(Debug)]
pub struct StartPage {
    session: Arc<dyn BrowserSession>,
    elements: StartPageElements,
    waiter: Waiter,
}

impl StartPage {
    /// Bind the page with the default 5 second action timeout
    pub async fn new(session: Arc<dyn BrowserSession>) -> Result<Self> {
        Self::with_waiter(session, Waiter::default()).await
    }

    /// Bind the page, maximize the window and apply the action timeout as
    /// the page-load and script timeout
    pub async fn with_waiter(session: Arc<dyn BrowserSession>, waiter: Waiter) -> Result<Self> {
        session.maximize_window().await?;
        session.set_timeouts(Timeouts::uniform(waiter.timeout())).await?;

        Ok(Self {
            elements: StartPageElements::bind(Arc::clone(&session)),
            session,
            waiter,
        })
    }

    pub fn elements(&self) -> &StartPageElements {
        &self.elements
    }

    pub fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    /// Open the login box
    #[instrument(skip(self))]
    pub async fn click_auth_button(&self) -> Result<&Self> {
        let button = &self.elements.auth_button;
        button.wait_clickable(&self.waiter).await?;
        button.click().await?;
        Ok(self)
    }

    /// Submit the login form and return the error message it shows
    #[instrument(skip(self, password))]
    pub async fn check_auth(&self, login: &str, password: &str) -> Result<String> {
        let e = &self.elements;

        e.login_box.wait_visible(&self.waiter).await?;
        e.login_field.send_keys(login).await?;
        e.password_field.send_keys(password).await?;

        e.login_button.wait_clickable(&self.waiter).await?;
        e.login_button.click().await?;

        e.login_error.wait_visible(&self.waiter).await?;
        let message = e.login_error.text().await?;
        info!("Login rejected with: {}", message);
        Ok(message)
    }

    /// Search for `query` and wait for the result block
    #[instrument(skip(self))]
    pub async fn get_search_results(&self, query: &str) -> Result<&Self> {
        let e = &self.elements;

        e.search_input.send_keys(query).await?;
        e.search_input.press_key(Key::Enter).await?;
        e.search_result.wait_visible(&self.waiter).await?;
        Ok(self)
    }

    /// Search for `query` and return the result block's header text
    #[instrument(skip(self))]
    pub async fn get_search_result_text(&self, query: &str) -> Result<String> {
        self.get_search_results(query).await?;
        self.elements.search_result.text().await
    }

    /// Search for `query`, add the first result to the cart and wait for the
    /// cart counter to change
    #[instrument(skip(self))]
    pub async fn click_add_to_cart_button(&self, query: &str) -> Result<&Self> {
        let e = &self.elements;

        self.get_search_results(query).await?;
        e.add_to_cart_button.wait_clickable(&self.waiter).await?;

        let before = e.cart_count.text().await?;
        e.add_to_cart_button.click().await?;
        let after = e.cart_count.wait_text_change(&self.waiter, &before).await?;

        debug!("Cart count changed from {:?} to {:?}", before, after);
        Ok(self)
    }

    /// Number shown by the cart counter
    #[instrument(skip(self))]
    pub async fn get_cart_count(&self) -> Result<i64> {
        let counter = &self.elements.cart_count;
        let text = counter.text().await?;

        text.trim()
            .parse::<i64>()
            .map_err(|_| Error::unexpected_text(counter.locator().to_string(), text))
    }

    /// Current document title
    pub async fn title(&self) -> Result<String> {
        self.session.title().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::{MockElement, MockSession, MOCK_LOGIN_ERROR, MOCK_SEARCH_HEADER};
    use std::time::Duration;

    async fn storefront() -> (Arc<MockSession>, StartPage) {
        let mock = Arc::new(MockSession::storefront("Интернет-магазин"));
        let page = StartPage::new(mock.clone()).await.unwrap();
        (mock, page)
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_maximizes_and_sets_timeouts() {
        let (mock, _page) = storefront().await;

        assert!(mock.is_maximized());
        assert_eq!(mock.timeouts(), Some(Timeouts::uniform(Duration::from_secs(5))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_auth_returns_error_text() {
        let (mock, page) = storefront().await;

        let message = page
            .click_auth_button()
            .await
            .unwrap()
            .check_auth("user@example.com", "wrong")
            .await
            .unwrap();

        assert_eq!(message, MOCK_LOGIN_ERROR);
        assert_eq!(mock.typed(locators::LOGIN_FIELD).as_deref(), Some("user@example.com"));
        assert_eq!(mock.typed(locators::PASSWORD_FIELD).as_deref(), Some("wrong"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_auth_without_opening_box_times_out() {
        let (_mock, page) = storefront().await;

        let err = page.check_auth("user", "pass").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_result_text() {
        let (mock, page) = storefront().await;

        let text = page.get_search_result_text("iphone").await.unwrap();

        assert_eq!(text, MOCK_SEARCH_HEADER);
        assert!(text.ends_with("НАЙДЕНО:"));
        assert!(mock.actions().contains(&format!("key {} Enter", locators::SEARCH_INPUT)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_to_cart_increments_counter() {
        let (_mock, page) = storefront().await;

        let before = page.get_cart_count().await.unwrap();
        page.click_add_to_cart_button("iphone").await.unwrap();
        let after = page.get_cart_count().await.unwrap();

        assert_eq!(after, before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_to_cart_fails_when_counter_never_changes() {
        let mock = Arc::new(
            MockSession::new("Shop")
                .with_element(locators::SEARCH_INPUT, MockElement::visible(""))
                .with_element(locators::SEARCH_RESULT, MockElement::visible(MOCK_SEARCH_HEADER))
                .with_element(locators::ADD_TO_CART_BUTTON, MockElement::visible("В корзину"))
                .with_element(locators::CART_COUNT, MockElement::visible("1")),
        );
        let page = StartPage::new(mock).await.unwrap();

        let err = page.click_add_to_cart_button("iphone").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_numeric_cart_count() {
        let mock = Arc::new(MockSession::new("Shop").with_element(locators::CART_COUNT, MockElement::visible("пусто")));
        let page = StartPage::new(mock).await.unwrap();

        match page.get_cart_count().await.unwrap_err() {
            Error::UnexpectedText { locator, text } => {
                assert_eq!(locator, "cart count (#itogCount)");
                assert_eq!(text, "пусто");
            }
            other => panic!("Expected UnexpectedText, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_counter_is_ambiguous() {
        let mock = Arc::new(
            MockSession::new("Shop")
                .with_element(locators::CART_COUNT, MockElement::visible("1"))
                .with_element(locators::CART_COUNT, MockElement::visible("2")),
        );
        let page = StartPage::new(mock).await.unwrap();

        let err = page.get_cart_count().await.unwrap_err();
        assert!(matches!(err, Error::AmbiguousElement { count: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_title() {
        let (_mock, page) = storefront().await;
        assert_eq!(page.title().await.unwrap(), "Интернет-магазин");
    }
}
