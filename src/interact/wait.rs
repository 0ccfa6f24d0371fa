//! Polling waits
//!
//! WebDriver has no auto-waiting, so every "wait for X" is a poll loop with a
//! deadline. Running out of time is an outcome, not an error.

use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::browser::{BrowserError, BrowserResult, Page, Selector};

const DEFAULT_POLL: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied,
    TimedOut,
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied)
    }
}

/// Deadline-bounded poller
#[derive(Clone, Copy, Debug)]
pub struct SmartWait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl SmartWait {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: DEFAULT_POLL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Poll `check` until it returns true or the deadline passes.
    ///
    /// `check` always runs at least once, so a zero timeout is a single probe.
    pub async fn until<F, Fut>(&self, mut check: F) -> BrowserResult<WaitOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BrowserResult<bool>>,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            if check().await? {
                return Ok(WaitOutcome::Satisfied);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    pub async fn until_visible(
        &self,
        page: &dyn Page,
        selector: &Selector,
    ) -> BrowserResult<WaitOutcome> {
        self.until(move || async move { Ok(visible_now(page, selector).await? > 0) })
            .await
    }

    pub async fn until_hidden(
        &self,
        page: &dyn Page,
        selector: &Selector,
    ) -> BrowserResult<WaitOutcome> {
        self.until(move || async move { Ok(visible_now(page, selector).await? == 0) })
            .await
    }

    pub async fn until_url(
        &self,
        page: &dyn Page,
        pattern: &UrlPattern,
    ) -> BrowserResult<WaitOutcome> {
        self.until(move || async move {
            match page.current_url().await {
                Ok(url) => Ok(pattern.matches(&url)),
                Err(BrowserError::SessionClosed) => Err(BrowserError::SessionClosed),
                Err(e) => {
                    debug!("URL probe failed: {}", e);
                    Ok(false)
                }
            }
        })
        .await
    }
}

/// Visible match count; transient driver errors count as zero
async fn visible_now(page: &dyn Page, selector: &Selector) -> BrowserResult<usize> {
    match page.count_visible(selector).await {
        Ok(count) => Ok(count),
        Err(BrowserError::SessionClosed) => Err(BrowserError::SessionClosed),
        Err(e) => {
            debug!("Visibility probe for {} failed: {}", selector, e);
            Ok(0)
        }
    }
}

/// URL glob: `**` spans anything, `*` stays within a path segment, `?` is a
/// single character. The whole URL must match.
#[derive(Clone, Debug)]
pub struct UrlPattern {
    glob: String,
    regex: Regex,
}

impl UrlPattern {
    pub fn glob(glob: &str) -> Result<Self, regex::Error> {
        let mut pattern = String::from("^");
        let mut chars = glob.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    pattern.push_str(".*");
                }
                '*' => pattern.push_str("[^/]*"),
                '?' => pattern.push('.'),
                other => pattern.push_str(&regex::escape(&other.to_string())),
            }
        }
        pattern.push('$');

        Ok(Self {
            glob: glob.to_string(),
            regex: Regex::new(&pattern)?,
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }
}
