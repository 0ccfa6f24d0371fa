//! Best-effort success detection
//!
//! After a form is submitted the console shows a toast, a notification or
//! just changes the page. The detector polls for known phrases and reports
//! `Unclear` when nothing recognisable shows up in time.

use regex::{Regex, RegexBuilder};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::browser::{BrowserError, BrowserResult, Page, Selector};
use crate::config::ValidationSettings;

const DEFAULT_POLL: Duration = Duration::from_millis(250);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
    Unclear,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(text) => write!(f, "success: {text}"),
            Outcome::Failure(text) => write!(f, "failure: {text}"),
            Outcome::Unclear => write!(f, "unclear"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SuccessDetector {
    success: Vec<Regex>,
    errors: Vec<Regex>,
    notifications: Vec<Selector>,
    verify: Vec<Selector>,
    poll_interval: Duration,
}

/// Case-insensitive pattern; strings that are not valid regexes match literally
fn compile(pattern: &str) -> Option<Regex> {
    let build = |p: &str| RegexBuilder::new(p).case_insensitive(true).build();
    match build(pattern).or_else(|_| build(&regex::escape(pattern))) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Ignoring pattern '{}': {}", pattern, e);
            None
        }
    }
}

impl SuccessDetector {
    pub fn new<S: AsRef<str>>(success: &[S], errors: &[S], notifications: &[S]) -> Self {
        let notifications = notifications
            .iter()
            .filter_map(|raw| match Selector::parse(raw.as_ref()) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    warn!("Ignoring notification selector: {}", e);
                    None
                }
            })
            .collect();

        Self {
            success: success.iter().filter_map(|p| compile(p.as_ref())).collect(),
            errors: errors.iter().filter_map(|p| compile(p.as_ref())).collect(),
            notifications,
            verify: Vec::new(),
            poll_interval: DEFAULT_POLL,
        }
    }

    pub fn from_validation(validation: &ValidationSettings) -> Self {
        Self::new(
            &validation.success_indicators,
            &validation.error_messages,
            &validation.notification_selectors,
        )
    }

    /// Additional success phrases for a single check
    pub fn with_success_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        self.success
            .extend(patterns.iter().filter_map(|p| compile(p.as_ref())));
        self
    }

    /// Elements whose appearance also counts as success, checked after the
    /// text patterns
    pub fn with_verify_selectors<S: AsRef<str>>(mut self, selectors: &[S]) -> Self {
        for raw in selectors {
            match Selector::parse(raw.as_ref()) {
                Ok(selector) => self.verify.push(selector),
                Err(e) => warn!("Ignoring verify selector: {}", e),
            }
        }
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Classify a piece of text; error phrases take precedence
    pub fn classify(&self, text: &str) -> Option<Outcome> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.errors.iter().any(|re| re.is_match(text)) {
            return Some(Outcome::Failure(text.to_string()));
        }
        if self.success.iter().any(|re| re.is_match(text)) {
            return Some(Outcome::Success(text.to_string()));
        }
        None
    }

    async fn probe(&self, page: &dyn Page) -> BrowserResult<Option<Outcome>> {
        for selector in &self.notifications {
            let texts = match page.texts(selector).await {
                Ok(texts) => texts,
                Err(BrowserError::SessionClosed) => return Err(BrowserError::SessionClosed),
                Err(e) => {
                    debug!("Notification probe {} failed: {}", selector, e);
                    continue;
                }
            };
            if let Some(outcome) = texts.iter().find_map(|t| self.classify(t)) {
                return Ok(Some(outcome));
            }
        }

        match page.body_text().await {
            Ok(body) => {
                if let Some(outcome) = self.classify_body(&body) {
                    return Ok(Some(outcome));
                }
            }
            Err(BrowserError::SessionClosed) => return Err(BrowserError::SessionClosed),
            Err(e) => debug!("Body probe failed: {}", e),
        }

        for selector in &self.verify {
            match page.count_visible(selector).await {
                Ok(count) if count > 0 => {
                    return Ok(Some(Outcome::Success(format!("{} visible", selector))))
                }
                Ok(_) => {}
                Err(BrowserError::SessionClosed) => return Err(BrowserError::SessionClosed),
                Err(e) => debug!("Verify probe {} failed: {}", selector, e),
            }
        }
        Ok(None)
    }

    /// Body text is matched line by line so the report names the phrase
    fn classify_body(&self, body: &str) -> Option<Outcome> {
        let lines: Vec<&str> = body.lines().collect();
        lines
            .iter()
            .find_map(|line| {
                self.errors
                    .iter()
                    .any(|re| re.is_match(line))
                    .then(|| Outcome::Failure(line.trim().to_string()))
            })
            .or_else(|| {
                lines.iter().find_map(|line| {
                    self.success
                        .iter()
                        .any(|re| re.is_match(line))
                        .then(|| Outcome::Success(line.trim().to_string()))
                })
            })
    }

    /// Poll until a known phrase appears or `timeout` elapses
    pub async fn detect(&self, page: &dyn Page, timeout: Duration) -> BrowserResult<Outcome> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(outcome) = self.probe(page).await? {
                debug!("Detected {}", outcome);
                return Ok(outcome);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Outcome::Unclear);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;

    fn detector() -> SuccessDetector {
        SuccessDetector::new(
            &["created successfully", "Repository '.*' created"],
            &["already exists", "Failed to"],
            &[".ant-message", "[role='alert']"],
        )
        .with_poll_interval(Duration::from_millis(5))
    }

    #[test]
    fn test_classify_prefers_errors() {
        let d = detector();
        assert_eq!(
            d.classify("Team created successfully"),
            Some(Outcome::Success("Team created successfully".into()))
        );
        assert_eq!(
            d.classify("Failed to create: already exists"),
            Some(Outcome::Failure("Failed to create: already exists".into()))
        );
        assert!(d.classify("Repository 'demo' CREATED").is_some());
        assert_eq!(d.classify("   "), None);
    }

    #[test]
    fn test_invalid_regex_matches_literally() {
        let d = SuccessDetector::new(&["Saved (ok"], &[] as &[&str], &[]);
        assert!(d.classify("Saved (ok)").is_some());
    }

    #[tokio::test]
    async fn test_detect_from_notification() {
        let page = FakePage::new("about:blank").element(".ant-message", "User created successfully");
        let outcome = detector()
            .detect(&page, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Success("User created successfully".into()));
    }

    #[tokio::test]
    async fn test_detect_from_body_line() {
        let page = FakePage::new("about:blank").body("Dashboard\nRegion already exists\nFooter");
        let outcome = detector()
            .detect(&page, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Failure("Region already exists".into()));
    }

    #[tokio::test]
    async fn test_detect_from_verify_selector() {
        let page = FakePage::new("about:blank")
            .body("Users")
            .element("[data-testid=\"system-user-activate-button-qa@example.com\"]", "Activate");
        let outcome = detector()
            .with_verify_selectors(&["[data-testid=\"system-user-activate-button-qa@example.com\"]"])
            .detect(&page, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Success(text) if text.contains("activate-button")));
    }

    #[tokio::test]
    async fn test_detect_unclear_on_timeout() {
        let page = FakePage::new("about:blank").body("Nothing to see");
        let outcome = detector()
            .detect(&page, Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Unclear);
    }
}
