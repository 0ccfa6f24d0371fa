//! Browser abstraction
//!
//! Everything above this module talks to a [`Page`]. The production
//! implementation drives a WebDriver endpoint through fantoccini; tests use a
//! scripted in-memory page.

mod selector;
mod webdriver;

#[cfg(test)]
pub mod fake;

pub use selector::Selector;
pub use webdriver::WebDriverFactory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while driving the browser
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("{description} not found ({tried} selector(s) tried)")]
    ElementNotFound { description: String, tried: usize },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("browser session is closed")]
    SessionClosed,

    #[error("webdriver command failed: {0}")]
    Driver(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("failed to start browser session: {0}")]
    Launch(String),
}

impl BrowserError {
    /// Element lookup failure for a single selector
    pub fn not_found(selector: &Selector) -> Self {
        BrowserError::ElementNotFound {
            description: selector.to_string(),
            tried: 1,
        }
    }
}

impl From<fantoccini::error::CmdError> for BrowserError {
    fn from(err: fantoccini::error::CmdError) -> Self {
        BrowserError::Driver(err.to_string())
    }
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Message captured from the page's `console` object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Resource Timing entry reported by the page
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub name: String,
    #[serde(default)]
    pub initiator_type: String,
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(default)]
    pub transfer_size: u64,
    #[serde(default)]
    pub start_time_ms: f64,
}

/// A single browser tab driven sequentially
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> BrowserResult<()>;

    async fn current_url(&self) -> BrowserResult<String>;

    async fn title(&self) -> BrowserResult<String>;

    /// Number of visible elements matching `selector`
    async fn count_visible(&self, selector: &Selector) -> BrowserResult<usize>;

    /// Click the first visible match
    async fn click(&self, selector: &Selector) -> BrowserResult<()>;

    /// Clear the first visible match and type `value`
    async fn fill(&self, selector: &Selector, value: &str) -> BrowserResult<()>;

    /// Attach a local file to the first matching file input, visible or not
    async fn upload(&self, selector: &Selector, path: &Path) -> BrowserResult<()>;

    /// Text of every visible match, in document order
    async fn texts(&self, selector: &Selector) -> BrowserResult<Vec<String>>;

    /// Cell texts for each visible row matched by `rows`
    async fn row_cells(&self, rows: &Selector) -> BrowserResult<Vec<Vec<String>>>;

    async fn body_text(&self) -> BrowserResult<String>;

    /// Serialized HTML of the current document
    async fn content(&self) -> BrowserResult<String>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> BrowserResult<Vec<u8>>;

    async fn console_messages(&self) -> BrowserResult<Vec<ConsoleMessage>>;

    async fn network_entries(&self) -> BrowserResult<Vec<NetworkEntry>>;

    async fn is_closed(&self) -> bool;

    async fn close(&self) -> BrowserResult<()>;
}

/// Opens fresh pages for the runner
#[async_trait]
pub trait PageFactory: Send + Sync {
    async fn open(&self) -> BrowserResult<Arc<dyn Page>>;
}
