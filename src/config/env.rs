//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;

use super::{AppConfig, BrowserKind, LogLevel};

/// Environment variable prefix
const ENV_PREFIX: &str = "CONSOLE_E2E";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Console base URL from CONSOLE_E2E_BASE_URL
    pub base_url: Option<String>,
    /// Login email from CONSOLE_E2E_EMAIL
    pub email: Option<String>,
    /// Login password from CONSOLE_E2E_PASSWORD
    pub password: Option<String>,
    /// Headless mode from CONSOLE_E2E_HEADLESS
    pub headless: Option<bool>,
    /// WebDriver endpoint from CONSOLE_E2E_WEBDRIVER_URL
    pub webdriver_url: Option<String>,
    /// Browser from CONSOLE_E2E_BROWSER
    pub browser: Option<String>,
    /// Artifacts root from CONSOLE_E2E_ARTIFACTS
    pub artifacts: Option<String>,
    /// Log level from CONSOLE_E2E_LOG_LEVEL
    pub log_level: Option<String>,
    /// Config file from CONSOLE_E2E_CONFIG
    pub config_file: Option<String>,
    /// Default suite from CONSOLE_E2E_SUITE
    pub suite: Option<String>,
    /// Output format from CONSOLE_E2E_FORMAT
    pub format: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            base_url: get_env("BASE_URL"),
            email: get_env("EMAIL"),
            password: get_env("PASSWORD"),
            headless: get_env_bool("HEADLESS"),
            webdriver_url: get_env("WEBDRIVER_URL"),
            browser: get_env("BROWSER"),
            artifacts: get_env("ARTIFACTS"),
            log_level: get_env("LOG_LEVEL"),
            config_file: get_env("CONFIG"),
            suite: get_env("SUITE"),
            format: get_env("FORMAT"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.base_url.is_some()
            || self.email.is_some()
            || self.password.is_some()
            || self.headless.is_some()
            || self.webdriver_url.is_some()
            || self.browser.is_some()
            || self.artifacts.is_some()
            || self.log_level.is_some()
            || self.config_file.is_some()
            || self.suite.is_some()
            || self.format.is_some()
    }

    /// Override config values that are set in the environment
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(email) = &self.email {
            config.login.credentials.email = email.clone();
        }
        if let Some(password) = &self.password {
            config.login.credentials.password = password.clone();
        }
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        if let Some(browser) = self.browser.as_deref().and_then(BrowserKind::from_str) {
            config.browser.browser = browser;
        }
        if let Some(root) = &self.artifacts {
            let root = PathBuf::from(root);
            config.screenshots.path = root.join("screenshots");
            config.artifacts.rebase(root);
        }
        if let Some(level) = self.log_level.as_deref().and_then(LogLevel::from_str) {
            config.logging.level = level;
        }
    }

    /// Get suite with fallback
    pub fn suite_or(&self, default: &str) -> String {
        self.suite.clone().unwrap_or_else(|| default.to_string())
    }

    /// Get output format with fallback
    pub fn format_or(&self, default: &str) -> String {
        self.format.clone().unwrap_or_else(|| default.to_string())
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        let masked = self.password.as_ref().map(|_| "***");
        println!("Environment Configuration:");
        println!("  {}_BASE_URL:      {:?}", ENV_PREFIX, self.base_url);
        println!("  {}_EMAIL:         {:?}", ENV_PREFIX, self.email);
        println!("  {}_PASSWORD:      {:?}", ENV_PREFIX, masked);
        println!("  {}_HEADLESS:      {:?}", ENV_PREFIX, self.headless);
        println!("  {}_WEBDRIVER_URL: {:?}", ENV_PREFIX, self.webdriver_url);
        println!("  {}_BROWSER:       {:?}", ENV_PREFIX, self.browser);
        println!("  {}_ARTIFACTS:     {:?}", ENV_PREFIX, self.artifacts);
        println!("  {}_LOG_LEVEL:     {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_CONFIG:        {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_SUITE:         {:?}", ENV_PREFIX, self.suite);
        println!("  {}_FORMAT:        {:?}", ENV_PREFIX, self.format);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Print all CONSOLE_E2E environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_BASE_URL       Console base URL");
    println!("  {ENV_PREFIX}_EMAIL          Login email");
    println!("  {ENV_PREFIX}_PASSWORD       Login password");
    println!("  {ENV_PREFIX}_HEADLESS       Run the browser headless (true/false)");
    println!("  {ENV_PREFIX}_WEBDRIVER_URL  WebDriver endpoint");
    println!("  {ENV_PREFIX}_BROWSER        Browser (chrome, firefox)");
    println!("  {ENV_PREFIX}_ARTIFACTS      Artifacts root directory");
    println!("  {ENV_PREFIX}_LOG_LEVEL      Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_CONFIG         Path to configuration file");
    println!("  {ENV_PREFIX}_SUITE          Default suite for `run`");
    println!("  {ENV_PREFIX}_FORMAT         Output format (table, json, csv, summary)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_BASE_URL=https://console.example.com");
    println!("  export {ENV_PREFIX}_HEADLESS=false");
    println!("  console-e2e run --suite full_suite");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.base_url.is_none());
        assert!(!config.has_any());
        assert_eq!(config.suite_or("full_suite"), "full_suite");
        assert_eq!(config.format_or("table"), "table");
    }

    #[test]
    fn test_apply_overrides() {
        let env = EnvConfig {
            base_url: Some("https://staging.example.com".to_string()),
            password: Some("s3cret".to_string()),
            headless: Some(false),
            browser: Some("firefox".to_string()),
            artifacts: Some("/tmp/e2e".to_string()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        assert!(env.has_any());

        let mut config = AppConfig::default();
        env.apply(&mut config);
        assert_eq!(config.base_url, "https://staging.example.com");
        assert_eq!(config.login.credentials.password, "s3cret");
        assert_eq!(config.login.credentials.email, "admin@rediacc.io");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.browser, BrowserKind::Firefox);
        assert_eq!(config.screenshots.path, PathBuf::from("/tmp/e2e/screenshots"));
        assert_eq!(config.artifacts.dumps, PathBuf::from("/tmp/e2e/dumps"));
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_unknown_browser_is_ignored() {
        let env = EnvConfig {
            browser: Some("netscape".to_string()),
            ..Default::default()
        };
        let mut config = AppConfig::default();
        env.apply(&mut config);
        assert_eq!(config.browser.browser, BrowserKind::Chrome);
    }
}
