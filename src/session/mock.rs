//! In-memory browser session for testing
//!
//! `MockSession` keeps a tiny fake DOM: a title, and for each CSS selector the
//! list of elements it matches. Clicks and key presses can trigger scripted
//! reactions, optionally after a delay, which is how the storefront's
//! asynchronous widgets (login box, search results, cart counter) are
//! modelled. Delayed effects are applied lazily on the next access, measured
//! with `tokio::time::Instant` so tests can run under paused time.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::session::traits::{BrowserSession, ElementState, Key, Locator, Timeouts};
use crate::{Error, Result};

/// Text the storefront shows for a rejected login
pub const MOCK_LOGIN_ERROR: &str = "Проверьте правильность введенных данных либо зарегистрируйтесь";

/// Header of the storefront's search result block
pub const MOCK_SEARCH_HEADER: &str = "РЕЗУЛЬТАТЫ ПОИСКА НАЙДЕНО:";

/// Fake element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    pub text: String,
    pub displayed: bool,
    pub enabled: bool,
}

impl MockElement {
    pub fn visible<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            displayed: true,
            enabled: true,
        }
    }

    pub fn hidden<S: Into<String>>(text: S) -> Self {
        Self {
            displayed: false,
            ..Self::visible(text)
        }
    }

    pub fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }
}

/// Change to the fake DOM
#[derive(Debug, Clone)]
pub enum Effect {
    /// Display every element under the selector
    Show(String),
    /// Hide every element under the selector
    Hide(String),
    /// Enable every element under the selector
    Enable(String),
    /// Replace the text of every element under the selector
    SetText(String, String),
    /// Parse the text as an integer and add one
    Increment(String),
    /// Make the selector match exactly this element
    Put(String, MockElement),
    /// Make the selector match nothing
    Remove(String),
    SetTitle(String),
}

/// Effect scheduled relative to its trigger
#[derive(Debug, Clone)]
pub struct Reaction {
    delay: Duration,
    effect: Effect,
}

impl Reaction {
    pub fn now(effect: Effect) -> Self {
        Self::after(Duration::ZERO, effect)
    }

    pub fn after(delay: Duration, effect: Effect) -> Self {
        Self { delay, effect }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Trigger {
    Click(String),
    Key(String, Key),
}

#[derive(Debug, Default)]
struct MockDom {
    title: String,
    url: String,
    elements: HashMap<String, Vec<MockElement>>,
    reactions: Vec<(Trigger, Reaction)>,
    scheduled: Vec<(Instant, Effect)>,
    typed: HashMap<String, String>,
    actions: Vec<String>,
    timeouts: Option<Timeouts>,
    maximized: bool,
    quit_count: usize,
}

impl MockDom {
    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Show(css) => self.update(&css, |e| e.displayed = true),
            Effect::Hide(css) => self.update(&css, |e| e.displayed = false),
            Effect::Enable(css) => self.update(&css, |e| e.enabled = true),
            Effect::SetText(css, text) => self.update(&css, |e| e.text = text.clone()),
            Effect::Increment(css) => self.update(&css, |e| {
                if let Ok(n) = e.text.trim().parse::<i64>() {
                    e.text = (n + 1).to_string();
                }
            }),
            Effect::Put(css, element) => {
                self.elements.insert(css, vec![element]);
            }
            Effect::Remove(css) => {
                self.elements.remove(&css);
            }
            Effect::SetTitle(title) => self.title = title,
        }
    }

    fn update<F: FnMut(&mut MockElement)>(&mut self, css: &str, f: F) {
        if let Some(elements) = self.elements.get_mut(css) {
            elements.iter_mut().for_each(f);
        }
    }

    /// Apply every scheduled effect that is due, oldest first
    fn settle(&mut self) {
        let now = Instant::now();
        let mut pending = Vec::new();
        let mut due = Vec::new();
        for (at, effect) in self.scheduled.drain(..) {
            if at <= now {
                due.push((at, effect));
            } else {
                pending.push((at, effect));
            }
        }
        self.scheduled = pending;

        due.sort_by_key(|(at, _)| *at);
        for (_, effect) in due {
            self.apply(effect);
        }
    }

    fn fire(&mut self, trigger: &Trigger) {
        let now = Instant::now();
        let reactions: Vec<Reaction> = self
            .reactions
            .iter()
            .filter(|(t, _)| t == trigger)
            .map(|(_, r)| r.clone())
            .collect();

        for reaction in reactions {
            if reaction.delay.is_zero() {
                self.apply(reaction.effect);
            } else {
                self.scheduled.push((now + reaction.delay, reaction.effect));
            }
        }
    }

    fn resolve(&self, locator: &Locator) -> Result<&MockElement> {
        match self.elements.get(locator.selector()).map(Vec::as_slice) {
            None | Some([]) => Err(Error::element_not_found(locator.to_string())),
            Some([element]) => Ok(element),
            Some(many) => Err(Error::ambiguous_element(locator.to_string(), many.len())),
        }
    }

    fn interactable(&self, locator: &Locator) -> Result<()> {
        let element = self.resolve(locator)?;
        if element.displayed && element.enabled {
            Ok(())
        } else {
            Err(Error::script_execution_failed(format!(
                "Element {} is not interactable (displayed: {}, enabled: {})",
                locator, element.displayed, element.enabled
            )))
        }
    }
}

/// In-memory browser session
#[derive(Debug)]
pub struct MockSession {
    id: String,
    is_active: AtomicBool,
    dom: Mutex<MockDom>,
}

impl MockSession {
    /// Empty page with a title
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            is_active: AtomicBool::new(true),
            dom: Mutex::new(MockDom {
                title: title.into(),
                url: "about:blank".to_string(),
                ..MockDom::default()
            }),
        }
    }

    /// Storefront start page
    ///
    /// Clicking the auth button opens the login box, a login attempt shows
    /// the login error, pressing Enter in the search input renders the result
    /// block and an add-to-cart button, and adding to the cart bumps the
    /// counter. Each reaction lands after a short delay.
    pub fn storefront<S: Into<String>>(title: S) -> Self {
        let delay = Duration::from_millis(300);
        let login_box = ".login-box.logout-box";
        let login_field = "input[name = 'login']";
        let password_field = "input[name = 'password']";
        let sign_in = "#signIn2";
        let login_error = ".login-error";
        let search = ".input-search";
        let result = ".search-word";
        let add_to_cart = ".search-block-name>.search-block>ul>li:nth-child(1)>div>.add-to-cart.buy";
        let cart = "#itogCount";

        Self::new(title)
            .with_element(search, MockElement::visible(""))
            .with_element(".authorization.login-button", MockElement::visible("Вход"))
            .with_element(login_box, MockElement::hidden(""))
            .with_element(login_field, MockElement::hidden(""))
            .with_element(password_field, MockElement::hidden(""))
            .with_element(sign_in, MockElement::hidden("Войти"))
            .with_element(login_error, MockElement::hidden(""))
            .with_element(cart, MockElement::visible("0"))
            .on_click(".authorization.login-button", Reaction::after(delay, Effect::Show(login_box.into())))
            .on_click(".authorization.login-button", Reaction::after(delay, Effect::Show(login_field.into())))
            .on_click(".authorization.login-button", Reaction::after(delay, Effect::Show(password_field.into())))
            .on_click(".authorization.login-button", Reaction::after(delay, Effect::Show(sign_in.into())))
            .on_click(sign_in, Reaction::after(delay, Effect::Put(login_error.into(), MockElement::visible(MOCK_LOGIN_ERROR))))
            .on_key(search, Key::Enter, Reaction::after(delay, Effect::Put(result.into(), MockElement::visible(MOCK_SEARCH_HEADER))))
            .on_key(search, Key::Enter, Reaction::after(delay, Effect::Put(add_to_cart.into(), MockElement::visible("В корзину"))))
            .on_click(add_to_cart, Reaction::after(delay, Effect::Increment(cart.into())))
    }

    fn dom(&self) -> Result<MutexGuard<'_, MockDom>> {
        self.dom
            .lock()
            .map_err(|_| Error::internal("Mock DOM lock poisoned"))
    }

    /// Settled DOM of a live session
    fn live_dom(&self) -> Result<MutexGuard<'_, MockDom>> {
        if !self.is_active.load(Ordering::Acquire) {
            return Err(Error::session_closed(&self.id));
        }
        let mut dom = self.dom()?;
        dom.settle();
        Ok(dom)
    }

    fn edit<F: FnOnce(&mut MockDom)>(mut self, f: F) -> Self {
        if let Ok(dom) = self.dom.get_mut() {
            f(dom);
        }
        self
    }

    /// Add an element matching `css`
    pub fn with_element<S: Into<String>>(self, css: S, element: MockElement) -> Self {
        let css = css.into();
        self.edit(|dom| dom.elements.entry(css).or_default().push(element))
    }

    pub fn on_click<S: Into<String>>(self, css: S, reaction: Reaction) -> Self {
        let trigger = Trigger::Click(css.into());
        self.edit(|dom| dom.reactions.push((trigger, reaction)))
    }

    pub fn on_key<S: Into<String>>(self, css: S, key: Key, reaction: Reaction) -> Self {
        let trigger = Trigger::Key(css.into(), key);
        self.edit(|dom| dom.reactions.push((trigger, reaction)))
    }

    /// Make `css` match exactly `element` right now
    pub fn put_element<S: Into<String>>(&self, css: S, element: MockElement) {
        if let Ok(mut dom) = self.dom.lock() {
            dom.apply(Effect::Put(css.into(), element));
        }
    }

    /// Apply an effect right now
    pub fn apply(&self, effect: Effect) {
        if let Ok(mut dom) = self.dom.lock() {
            dom.apply(effect);
        }
    }

    /// Text typed into `css` so far
    pub fn typed(&self, css: &str) -> Option<String> {
        self.dom.lock().ok().and_then(|dom| dom.typed.get(css).cloned())
    }

    /// Actions performed, e.g. `click #signIn2`
    pub fn actions(&self) -> Vec<String> {
        self.dom.lock().map(|dom| dom.actions.clone()).unwrap_or_default()
    }

    pub fn timeouts(&self) -> Option<Timeouts> {
        self.dom.lock().ok().and_then(|dom| dom.timeouts)
    }

    pub fn is_maximized(&self) -> bool {
        self.dom.lock().map(|dom| dom.maximized).unwrap_or(false)
    }

    /// Number of `quit` calls, including ones on a closed session
    pub fn quit_count(&self) -> usize {
        self.dom.lock().map(|dom| dom.quit_count).unwrap_or(0)
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut dom = self.live_dom()?;
        dom.url = url.to_string();
        dom.actions.push(format!("navigate {}", url));
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.live_dom()?.title.clone())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.live_dom()?.url.clone())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self
            .live_dom()?
            .elements
            .get(locator.selector())
            .map_or(0, Vec::len))
    }

    async fn element_state(&self, locator: &Locator) -> Result<ElementState> {
        let dom = self.live_dom()?;
        let element = dom.resolve(locator)?;
        Ok(ElementState {
            displayed: element.displayed,
            enabled: element.enabled,
        })
    }

    async fn text(&self, locator: &Locator) -> Result<String> {
        let dom = self.live_dom()?;
        let element = dom.resolve(locator)?;
        // Hidden elements have no rendered text
        Ok(if element.displayed {
            element.text.trim().to_string()
        } else {
            String::new()
        })
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let mut dom = self.live_dom()?;
        dom.interactable(locator)?;
        dom.actions.push(format!("click {}", locator.selector()));
        dom.fire(&Trigger::Click(locator.selector().to_string()));
        Ok(())
    }

    async fn send_keys(&self, locator: &Locator, text: &str) -> Result<()> {
        let mut dom = self.live_dom()?;
        dom.interactable(locator)?;
        dom.actions.push(format!("type {} {}", locator.selector(), text));
        dom.typed
            .entry(locator.selector().to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn press_key(&self, locator: &Locator, key: Key) -> Result<()> {
        let mut dom = self.live_dom()?;
        dom.interactable(locator)?;
        dom.actions.push(format!("key {} {}", locator.selector(), key.key()));
        dom.fire(&Trigger::Key(locator.selector().to_string(), key));
        Ok(())
    }

    async fn set_timeouts(&self, timeouts: Timeouts) -> Result<()> {
        self.live_dom()?.timeouts = Some(timeouts);
        Ok(())
    }

    async fn maximize_window(&self) -> Result<()> {
        self.live_dom()?.maximized = true;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let _dom = self.live_dom()?;
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    async fn quit(&self) -> Result<()> {
        self.is_active.store(false, Ordering::Release);
        self.dom()?.quit_count += 1;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }
}
