//! Console login

use serde_json::json;
use thiserror::Error;
use tracing::info;

use super::ConsoleSession;
use crate::browser::BrowserError;
use crate::interact::{SelectorCascade, SmartWait, UrlPattern};
use crate::logging::events;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("login form incomplete: {0}")]
    Form(BrowserError),

    #[error("dashboard {pattern} not reached within {timeout_ms}ms (still at {url})")]
    DashboardTimeout {
        pattern: String,
        url: String,
        timeout_ms: u64,
    },

    #[error("invalid dashboard pattern '{0}'")]
    Pattern(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl LoginError {
    fn from_lookup(error: BrowserError) -> Self {
        match error {
            BrowserError::ElementNotFound { .. } => LoginError::Form(error),
            other => LoginError::Browser(other),
        }
    }
}

impl ConsoleSession {
    /// Open the login page, submit the configured credentials and wait for
    /// the dashboard URL
    pub async fn login(&self) -> Result<(), LoginError> {
        let config = self.config();
        let selectors = &config.login.selectors;
        let credentials = &config.login.credentials;
        let page = self.page();
        let per_candidate = config.timeouts.candidate();

        let email = SelectorCascade::new("email field", selectors.email.iter().cloned());
        let password = SelectorCascade::new("password field", selectors.password.iter().cloned());
        let submit = SelectorCascade::new("sign-in button", selectors.submit.iter().cloned());
        let dashboard = UrlPattern::glob(&config.validation.dashboard_url)
            .map_err(|_| LoginError::Pattern(config.validation.dashboard_url.clone()))?;

        let login_url = config.login_url();
        events::test_step("login", "open login page", "start");
        events::browser_action("navigate", &login_url, &json!({}));
        page.goto(&login_url).await?;

        // The form renders after the bundle loads
        let field = email
            .locate(page, config.timeouts.element(), per_candidate)
            .await
            .map_err(LoginError::from_lookup)?;
        page.fill(&field.selector, &credentials.email).await?;
        events::browser_action("fill", "email field", &json!({ "email": credentials.email }));

        password
            .fill(page, &credentials.password, per_candidate)
            .await
            .map_err(LoginError::from_lookup)?;
        events::browser_action("fill", "password field", &json!({ "password": credentials.password }));

        submit
            .click(page, per_candidate)
            .await
            .map_err(LoginError::from_lookup)?;
        events::test_step("login", "submit", "done");

        let timeout = config.timeouts.navigation();
        let outcome = SmartWait::new(timeout)
            .with_poll_interval(config.timeouts.poll_interval().min(timeout))
            .until_url(page, &dashboard)
            .await?;

        if outcome.is_satisfied() {
            info!("Logged in as {}", credentials.email);
            events::test_step("login", "dashboard", "reached");
            Ok(())
        } else {
            let url = page.current_url().await.unwrap_or_default();
            Err(LoginError::DashboardTimeout {
                pattern: dashboard.as_str().to_string(),
                url,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{Effect, FakePage};
    use crate::session::tests::test_config;
    use std::sync::Arc;
    use tempfile::tempdir;

    const EMAIL: &str = "[data-testid=\"login-email-input\"]";
    const PASSWORD: &str = "input[type=\"password\"]";
    const SUBMIT: &str = "button:has-text(\"Sign In\")";

    fn login_page(dashboard: bool) -> Arc<FakePage> {
        let page = FakePage::new("about:blank")
            .element(EMAIL, "")
            .element(PASSWORD, "")
            .element(SUBMIT, "Sign In");
        let page = if dashboard {
            page.on_click(
                SUBMIT,
                Effect::Url("http://console.test/console/dashboard".to_string()),
            )
        } else {
            page
        };
        page.shared()
    }

    #[tokio::test]
    async fn test_login_reaches_dashboard() {
        let dir = tempdir().unwrap();
        let page = login_page(true);
        let session = ConsoleSession::new(page.clone(), Arc::new(test_config(dir.path())));

        session.login().await.unwrap();

        assert_eq!(page.visits(), vec!["http://console.test/console/login"]);
        assert_eq!(page.value_of(EMAIL).as_deref(), Some("admin@rediacc.io"));
        assert_eq!(page.value_of(PASSWORD).as_deref(), Some("admin"));
        assert!(page.clicked(SUBMIT));
    }

    #[tokio::test]
    async fn test_login_dashboard_timeout() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let expected = config.validation.dashboard_url.clone();
        let session = ConsoleSession::new(login_page(false), Arc::new(config));

        match session.login().await.unwrap_err() {
            LoginError::DashboardTimeout {
                pattern,
                url,
                timeout_ms,
            } => {
                assert_eq!(pattern, expected);
                assert_eq!(url, "http://console.test/console/login");
                assert_eq!(timeout_ms, 30);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_login_missing_field() {
        let dir = tempdir().unwrap();
        let page = FakePage::new("about:blank").element(EMAIL, "").shared();
        let session = ConsoleSession::new(page, Arc::new(test_config(dir.path())));

        let err = session.login().await.unwrap_err();
        assert!(matches!(err, LoginError::Form(_)));
        assert!(err.to_string().contains("password field"));
    }

    #[tokio::test]
    async fn test_login_closed_browser() {
        let dir = tempdir().unwrap();
        let page = login_page(true);
        page.set_closed();
        let session = ConsoleSession::new(page, Arc::new(test_config(dir.path())));
        assert!(matches!(
            session.login().await.unwrap_err(),
            LoginError::Browser(BrowserError::SessionClosed)
        ));
    }
}
