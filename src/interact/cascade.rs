//! Selector fallback cascade
//!
//! UI markup drifts between releases, so each logical element is described by
//! an ordered list of candidate selectors. The first candidate that becomes
//! visible wins; there is no scoring beyond list order.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::wait::SmartWait;
use crate::browser::{BrowserError, BrowserResult, Page, Selector};

const UPLOAD_RETRY: Duration = Duration::from_millis(250);

/// A logical element and its candidate selectors
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectorCascade {
    pub description: String,
    pub selectors: Vec<String>,
}

/// Candidate that matched
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    pub selector: Selector,
    pub index: usize,
}

impl SelectorCascade {
    pub fn new<I, S>(description: impl Into<String>, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            description: description.into(),
            selectors: selectors.into_iter().map(Into::into).collect(),
        }
    }

    /// Apply a text transformation (template rendering) to every candidate
    pub fn map(&self, f: impl Fn(&str) -> String) -> Self {
        Self {
            description: f(&self.description),
            selectors: self.selectors.iter().map(|s| f(s)).collect(),
        }
    }

    /// First candidate visible within `per_candidate`
    pub async fn resolve(
        &self,
        page: &dyn Page,
        per_candidate: Duration,
    ) -> BrowserResult<Resolved> {
        let wait = SmartWait::new(per_candidate);

        for (index, raw) in self.selectors.iter().enumerate() {
            let selector = match Selector::parse(raw) {
                Ok(selector) => selector,
                Err(e) => {
                    warn!("Skipping candidate for {}: {}", self.description, e);
                    continue;
                }
            };

            match wait.until_visible(page, &selector).await {
                Ok(outcome) if outcome.is_satisfied() => {
                    debug!(
                        "Found {} with selector #{}: {}",
                        self.description,
                        index + 1,
                        raw
                    );
                    return Ok(Resolved { selector, index });
                }
                Ok(_) => debug!("Selector {} not visible for {}", raw, self.description),
                Err(BrowserError::SessionClosed) => return Err(BrowserError::SessionClosed),
                Err(e) => debug!("Selector {} failed: {}", raw, e),
            }
        }

        Err(BrowserError::ElementNotFound {
            description: self.description.clone(),
            tried: self.selectors.len(),
        })
    }

    /// Wait up to `timeout` for any candidate to show up, then resolve in
    /// list order
    pub async fn locate(
        &self,
        page: &dyn Page,
        timeout: Duration,
        per_candidate: Duration,
    ) -> BrowserResult<Resolved> {
        let appeared = SmartWait::new(timeout)
            .until(move || self.is_present(page, Duration::ZERO))
            .await?;
        if !appeared.is_satisfied() {
            return Err(BrowserError::ElementNotFound {
                description: self.description.clone(),
                tried: self.selectors.len(),
            });
        }
        self.resolve(page, per_candidate).await
    }

    pub async fn click(&self, page: &dyn Page, per_candidate: Duration) -> BrowserResult<Resolved> {
        let resolved = self.resolve(page, per_candidate).await?;
        page.click(&resolved.selector).await?;
        Ok(resolved)
    }

    pub async fn fill(
        &self,
        page: &dyn Page,
        value: &str,
        per_candidate: Duration,
    ) -> BrowserResult<Resolved> {
        let resolved = self.resolve(page, per_candidate).await?;
        page.fill(&resolved.selector, value).await?;
        Ok(resolved)
    }

    /// Attach `path` to the first candidate present in the DOM, hidden or
    /// not, retrying until `timeout`
    pub async fn upload(
        &self,
        page: &dyn Page,
        path: &Path,
        timeout: Duration,
    ) -> BrowserResult<Resolved> {
        let deadline = Instant::now() + timeout;
        loop {
            for (index, raw) in self.selectors.iter().enumerate() {
                let Ok(selector) = Selector::parse(raw) else {
                    continue;
                };
                match page.upload(&selector, path).await {
                    Ok(()) => {
                        debug!("Uploaded {} through {}", path.display(), raw);
                        return Ok(Resolved { selector, index });
                    }
                    Err(BrowserError::ElementNotFound { .. }) => {}
                    Err(e) => return Err(e),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(BrowserError::ElementNotFound {
                    description: self.description.clone(),
                    tried: self.selectors.len(),
                });
            }
            tokio::time::sleep(UPLOAD_RETRY.min(deadline - now)).await;
        }
    }

    /// Whether any candidate is visible; lookup failures count as absent
    pub async fn is_present(&self, page: &dyn Page, per_candidate: Duration) -> BrowserResult<bool> {
        match self.resolve(page, per_candidate).await {
            Ok(_) => Ok(true),
            Err(BrowserError::ElementNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;

    const FAST: Duration = Duration::from_millis(10);

    fn email_cascade() -> SelectorCascade {
        SelectorCascade::new(
            "email field",
            [
                "[data-testid=\"login-email-input\"]",
                "input[type=\"email\"]",
                "input[placeholder*=\"email\" i]",
            ],
        )
    }

    #[tokio::test]
    async fn test_first_visible_in_list_order() {
        let page = FakePage::new("about:blank")
            .hidden("[data-testid=\"login-email-input\"]")
            .element("input[type=\"email\"]", "")
            .element("input[placeholder*=\"email\" i]", "");

        let resolved = email_cascade().resolve(&page, FAST).await.unwrap();
        assert_eq!(resolved.index, 1);
        assert_eq!(resolved.selector, Selector::css("input[type=\"email\"]"));
    }

    #[tokio::test]
    async fn test_fill_uses_resolved_candidate() {
        let page = FakePage::new("about:blank").element("input[placeholder*=\"email\" i]", "");
        email_cascade()
            .fill(&page, "admin@example.com", FAST)
            .await
            .unwrap();
        assert_eq!(
            page.value_of("input[placeholder*=\"email\" i]").as_deref(),
            Some("admin@example.com")
        );
    }

    #[tokio::test]
    async fn test_not_found_reports_description() {
        let page = FakePage::new("about:blank");
        let err = email_cascade().click(&page, FAST).await.unwrap_err();
        match err {
            BrowserError::ElementNotFound { description, tried } => {
                assert_eq!(description, "email field");
                assert_eq!(tried, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!email_cascade().is_present(&page, FAST).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_candidates_are_skipped() {
        let page = FakePage::new("about:blank").element("button:has-text(\"Save\")", "Save");
        let cascade = SelectorCascade::new(
            "save button",
            ["tr:first-child:has-text(\"Save\")", "button:has-text(\"Save\")"],
        );
        let resolved = cascade.click(&page, FAST).await.unwrap();
        assert_eq!(resolved.index, 1);
        assert!(page.clicked("button:has-text(\"Save\")"));
    }

    #[tokio::test]
    async fn test_locate_waits_for_any_candidate() {
        let page = FakePage::new("about:blank").element("input[placeholder*=\"email\" i]", "");
        let resolved = email_cascade()
            .locate(&page, Duration::from_millis(50), FAST)
            .await
            .unwrap();
        assert_eq!(resolved.index, 2);

        let empty = FakePage::new("about:blank");
        let err = email_cascade()
            .locate(&empty, Duration::from_millis(20), FAST)
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::ElementNotFound { tried: 3, .. }));
    }

    #[tokio::test]
    async fn test_upload_accepts_hidden_input() {
        let page = FakePage::new("about:blank").hidden("input[type=\"file\"]");
        let cascade = SelectorCascade::new(
            "config file input",
            ["[data-testid=\"rclone-wizard-upload\"] input", "input[type=\"file\"]"],
        );
        let path = Path::new("/tmp/rclone.conf");

        let resolved = cascade.upload(&page, path, FAST).await.unwrap();
        assert_eq!(resolved.index, 1);
        assert_eq!(page.uploads()[0].1, path);

        let empty = FakePage::new("about:blank");
        let err = cascade.upload(&empty, path, FAST).await.unwrap_err();
        assert!(matches!(err, BrowserError::ElementNotFound { tried: 2, .. }));
    }

    #[test]
    fn test_map_renders_candidates() {
        let cascade = SelectorCascade::new("row {name}", ["tr:has-text(\"{name}\")"]);
        let rendered = cascade.map(|s| s.replace("{name}", "repo1"));
        assert_eq!(rendered.description, "row repo1");
        assert_eq!(rendered.selectors, vec!["tr:has-text(\"repo1\")"]);
    }
}
