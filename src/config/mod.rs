//! Configuration module
//!
//! Handles loading and managing configuration.

mod env;
mod file;
mod suite;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;
pub use suite::SuiteDefinition;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Console origin, e.g. `http://localhost:7322`
    pub base_url: String,

    /// Path of the login page relative to `baseUrl`
    pub login_path: String,

    /// WebDriver endpoint (chromedriver / geckodriver / Selenium)
    pub webdriver_url: String,

    pub login: LoginSettings,
    pub browser: BrowserSettings,
    pub timeouts: Timeouts,
    pub screenshots: ScreenshotSettings,
    pub artifacts: ArtifactSettings,
    pub validation: ValidationSettings,

    /// Values available to scenario templates as `{name}`
    pub test_data: BTreeMap<String, String>,

    pub logging: LoggingSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7322".to_string(),
            login_path: "/console/login".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            login: LoginSettings::default(),
            browser: BrowserSettings::default(),
            timeouts: Timeouts::default(),
            screenshots: ScreenshotSettings::default(),
            artifacts: ArtifactSettings::default(),
            validation: ValidationSettings::default(),
            test_data: BTreeMap::new(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Absolute URL for a console path
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub fn login_url(&self) -> String {
        self.url_for(&self.login_path)
    }

    /// JSON snapshot with credentials and other sensitive values masked
    pub fn sanitized(&self) -> serde_json::Value {
        let value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        crate::logging::Sanitizer::new(&self.logging.filters.sanitize_fields).sanitize(&value)
    }

    /// Basic value checks; suite references are checked by [`ConfigFile::validate`]
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("baseUrl must not be empty");
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!("baseUrl must start with http:// or https://: {}", self.base_url);
        }
        if self.webdriver_url.trim().is_empty() {
            anyhow::bail!("webdriverUrl must not be empty");
        }
        self.timeouts.validate()?;
        if self.browser.viewport.width == 0 || self.browser.viewport.height == 0 {
            anyhow::bail!("browser.viewport dimensions must be positive");
        }
        Ok(())
    }
}

/// Login credentials and the selectors used to find the login form
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginSettings {
    pub credentials: Credentials,
    pub selectors: LoginSelectors,
}

#[derive(Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: "admin@rediacc.io".to_string(),
            password: "admin".to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginSelectors {
    pub email: Vec<String>,
    pub password: Vec<String>,
    pub submit: Vec<String>,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            email: vec![
                "[data-testid=\"login-email-input\"]".to_string(),
                "input[type=\"email\"]".to_string(),
                "input[placeholder*=\"email\" i]".to_string(),
            ],
            password: vec![
                "[data-testid=\"login-password-input\"]".to_string(),
                "input[type=\"password\"]".to_string(),
                "input[placeholder*=\"password\" i]".to_string(),
            ],
            submit: vec![
                "[data-testid=\"login-submit-button\"]".to_string(),
                "button[type=\"submit\"]".to_string(),
                "button:has-text(\"Sign In\")".to_string(),
                "button:has-text(\"Login\")".to_string(),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

impl BrowserKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chrome" | "chromium" => Some(BrowserKind::Chrome),
            "firefox" | "gecko" => Some(BrowserKind::Firefox),
            _ => None,
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserKind::Chrome => write!(f, "chrome"),
            BrowserKind::Firefox => write!(f, "firefox"),
        }
    }
}

/// Browser launch options
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserSettings {
    pub browser: BrowserKind,
    pub headless: bool,
    /// Delay before each click/fill, in milliseconds
    pub slow_mo: u64,
    pub viewport: Viewport,
    /// Extra command line arguments passed to the browser
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            headless: true,
            slow_mo: 0,
            viewport: Viewport::default(),
            args: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Timeouts in milliseconds
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeouts {
    pub page_load: u64,
    pub navigation: u64,
    pub element: u64,
    /// Per-candidate wait inside a selector cascade
    pub candidate: u64,
    pub modal_open: u64,
    pub validation: u64,
    pub queue: u64,
    pub queue_appear: u64,
    pub poll_interval: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load: 30_000,
            navigation: 10_000,
            element: 5_000,
            candidate: 1_000,
            modal_open: 3_000,
            validation: 5_000,
            queue: 120_000,
            queue_appear: 30_000,
            poll_interval: 1_000,
        }
    }
}

impl Timeouts {
    pub fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation)
    }

    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element)
    }

    pub fn candidate(&self) -> Duration {
        Duration::from_millis(self.candidate)
    }

    pub fn modal_open(&self) -> Duration {
        Duration::from_millis(self.modal_open)
    }

    pub fn validation(&self) -> Duration {
        Duration::from_millis(self.validation)
    }

    pub fn queue(&self) -> Duration {
        Duration::from_millis(self.queue)
    }

    pub fn queue_appear(&self) -> Duration {
        Duration::from_millis(self.queue_appear)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let fields = [
            ("pageLoad", self.page_load),
            ("navigation", self.navigation),
            ("element", self.element),
            ("candidate", self.candidate),
            ("modalOpen", self.modal_open),
            ("validation", self.validation),
            ("queue", self.queue),
            ("queueAppear", self.queue_appear),
            ("pollInterval", self.poll_interval),
        ];
        for (name, value) in fields {
            if value == 0 {
                anyhow::bail!("timeouts.{name} must be positive");
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenshotSettings {
    pub enabled: bool,
    pub path: PathBuf,
    /// Capture `error_<scenario>` when a scenario fails
    pub on_error: bool,
}

impl Default for ScreenshotSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("artifacts/screenshots"),
            on_error: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtifactSettings {
    pub root: PathBuf,
    pub logs: PathBuf,
    pub dumps: PathBuf,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("artifacts"),
            logs: PathBuf::from("artifacts/logs"),
            dumps: PathBuf::from("artifacts/dumps"),
        }
    }
}

impl ArtifactSettings {
    /// Re-root every artifact directory under `root`
    pub fn rebase(&mut self, root: impl Into<PathBuf>) {
        let root = root.into();
        self.logs = root.join("logs");
        self.dumps = root.join("dumps");
        self.root = root;
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }
}

/// Phrases and selectors used to judge whether an action worked
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSettings {
    /// URL glob reached after a successful login
    pub dashboard_url: String,
    pub success_indicators: Vec<String>,
    pub error_messages: Vec<String>,
    pub notification_selectors: Vec<String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            dashboard_url: "**/console/dashboard".to_string(),
            success_indicators: vec![
                "created successfully".to_string(),
                "updated successfully".to_string(),
                "deleted successfully".to_string(),
                "saved successfully".to_string(),
                "successfully".to_string(),
            ],
            error_messages: vec![
                "already exists".to_string(),
                "failed to".to_string(),
                "error occurred".to_string(),
                "invalid credentials".to_string(),
            ],
            notification_selectors: vec![
                ".ant-message".to_string(),
                ".ant-notification".to_string(),
                "[role='alert']".to_string(),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" | "critical" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogHandler {
    Console,
    File,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileLogFormat {
    Text,
    Json,
    #[default]
    Both,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub enabled: bool,
    pub level: LogLevel,
    pub handlers: Vec<LogHandler>,
    pub file_settings: FileLogSettings,
    pub console_settings: ConsoleLogSettings,
    pub filters: LogFilters,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            handlers: vec![LogHandler::Console, LogHandler::File],
            file_settings: FileLogSettings::default(),
            console_settings: ConsoleLogSettings::default(),
            filters: LogFilters::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FileLogSettings {
    pub directory: PathBuf,
    pub max_size_mb: u64,
    pub rotation_count: usize,
    pub format: FileLogFormat,
}

impl Default for FileLogSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            max_size_mb: 50,
            rotation_count: 5,
            format: FileLogFormat::Both,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleLogSettings {
    pub colorize: bool,
}

impl Default for ConsoleLogSettings {
    fn default() -> Self {
        Self { colorize: true }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LogFilters {
    /// Keys (substring, case-insensitive) whose values are masked
    pub sanitize_fields: Vec<String>,
}

impl Default for LogFilters {
    fn default() -> Self {
        Self {
            sanitize_fields: ["password", "token", "credential", "secret"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.login_url(), "http://localhost:7322/console/login");
        assert_eq!(config.timeouts.queue(), Duration::from_secs(120));
        assert_eq!(config.timeouts.poll_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "baseUrl": "https://console.example.com/",
            "browser": { "headless": false, "slowMo": 250 },
            "timeouts": { "queue": 60000 },
            "testData": { "machine_name": "worker-1" }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.url_for("/console/resources"), "https://console.example.com/console/resources");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.slow_mo, 250);
        assert_eq!(config.browser.viewport, Viewport::default());
        assert_eq!(config.timeouts.queue, 60_000);
        assert_eq!(config.timeouts.element, 5_000);
        assert_eq!(config.test_data["machine_name"], "worker-1");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig {
            base_url: "localhost:7322".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.base_url = "http://localhost".to_string();
        config.timeouts.candidate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sanitized_snapshot_masks_password() {
        let config = AppConfig::default();
        let snapshot = config.sanitized();
        assert_eq!(snapshot["login"]["credentials"], "***SANITIZED***");
        assert_eq!(snapshot["baseUrl"], "http://localhost:7322");
        assert!(!format!("{:?}", config.login.credentials).contains("\"admin\""));
    }

    #[test]
    fn test_browser_kind_and_log_level() {
        assert_eq!(BrowserKind::from_str("Chromium"), Some(BrowserKind::Chrome));
        assert_eq!(BrowserKind::from_str("safari"), None);
        assert_eq!(LogLevel::from_str("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("verbose"), None);
    }

    #[test]
    fn test_artifact_rebase() {
        let mut artifacts = ArtifactSettings::default();
        artifacts.rebase("/tmp/run");
        assert_eq!(artifacts.logs, PathBuf::from("/tmp/run/logs"));
        assert_eq!(artifacts.results_dir(), PathBuf::from("/tmp/run/results"));
    }
}
