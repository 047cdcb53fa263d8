//! Page objects
//!
//! A page object binds named locators to a session and exposes the user
//! actions of one page, built from element handles and waits.

pub mod start_page;

pub use start_page::{locators, StartPage, StartPageElements};
