//! Pre-flight checks
//!
//! Verifies the environment before a run: the console answers, the WebDriver
//! endpoint is ready for new sessions and the artifacts directory is
//! writable.

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AppConfig;

/// Individual check result
#[derive(Clone, Debug)]
pub struct HealthCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

impl HealthCheck {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
        }
    }
}

/// Pre-flight checks before running scenarios
pub struct PreFlightChecker {
    client: Client,
    base_url: String,
    webdriver_url: String,
    artifacts: PathBuf,
}

impl PreFlightChecker {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            webdriver_url: config.webdriver_url.trim_end_matches('/').to_string(),
            artifacts: config.artifacts.root.clone(),
        })
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(self)
    }

    /// Run all pre-flight checks
    pub async fn run(&self) -> PreFlightResult {
        info!("Running pre-flight checks against {}", self.base_url);

        let checks = vec![
            self.check_console().await,
            self.check_webdriver().await,
            check_artifacts(&self.artifacts),
        ];

        let passed = checks.iter().filter(|c| c.passed).count();
        let total = checks.len();

        PreFlightResult {
            passed: passed == total,
            checks,
            message: if passed == total {
                "All pre-flight checks passed. Ready to run scenarios.".to_string()
            } else {
                format!("{passed}/{total} checks passed. Some issues found.")
            },
        }
    }

    async fn check_console(&self) -> HealthCheck {
        let name = "Console";
        match self.client.get(&self.base_url).send().await {
            Ok(response) if response.status().as_u16() < 500 => {
                HealthCheck::pass(name, format!("HTTP {}", response.status().as_u16()))
            }
            Ok(response) => HealthCheck::fail(
                name,
                format!("Server error: HTTP {}", response.status().as_u16()),
            ),
            Err(e) => HealthCheck::fail(name, format!("Unreachable: {e}")),
        }
    }

    async fn check_webdriver(&self) -> HealthCheck {
        let name = "WebDriver";
        let url = format!("{}/status", self.webdriver_url);
        debug!("GET {url}");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return HealthCheck::fail(name, format!("Unreachable: {e}")),
        };
        if !response.status().is_success() {
            return HealthCheck::fail(name, format!("HTTP {}", response.status().as_u16()));
        }
        match response.json::<serde_json::Value>().await {
            Ok(body) => webdriver_status(&body),
            Err(e) => HealthCheck::fail(name, format!("Invalid status body: {e}")),
        }
    }
}

/// Interpret a WebDriver `/status` body
fn webdriver_status(body: &serde_json::Value) -> HealthCheck {
    let value = &body["value"];
    let message = value["message"].as_str().unwrap_or("").to_string();
    match value["ready"].as_bool() {
        Some(true) => HealthCheck::pass(
            "WebDriver",
            if message.is_empty() { "Ready".to_string() } else { message },
        ),
        Some(false) => HealthCheck::fail("WebDriver", format!("Not ready: {message}")),
        None => HealthCheck::fail("WebDriver", "Status has no ready flag"),
    }
}

fn check_artifacts(root: &Path) -> HealthCheck {
    let name = "Artifacts";
    if let Err(e) = std::fs::create_dir_all(root) {
        return HealthCheck::fail(name, format!("Cannot create {}: {e}", root.display()));
    }
    let probe = root.join(".preflight");
    match std::fs::write(&probe, b"ok") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            HealthCheck::pass(name, format!("{} is writable", root.display()))
        }
        Err(e) => HealthCheck::fail(name, format!("Not writable: {e}")),
    }
}

/// Pre-flight check result
#[derive(Clone, Debug)]
pub struct PreFlightResult {
    /// Whether all checks passed
    pub passed: bool,

    pub checks: Vec<HealthCheck>,

    pub message: String,
}

impl PreFlightResult {
    /// Format as table
    pub fn format_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\n┌─────────────────────────────────────────────────────────────┐\n");
        output.push_str("│ Pre-Flight Checks                                           │\n");
        output.push_str("├─────────────────────────────────────────────────────────────┤\n");

        for check in &self.checks {
            let status = if check.passed { "✓" } else { "✗" };
            output.push_str(&format!(
                "│ {} {:20} {:37} │\n",
                status,
                check.name,
                truncate(&check.message, 37)
            ));
        }

        output.push_str("├─────────────────────────────────────────────────────────────┤\n");
        output.push_str(&format!(
            "│ Result: {:51} │\n",
            if self.passed { "READY" } else { "BLOCKED" }
        ));
        output.push_str("└─────────────────────────────────────────────────────────────┘\n");
        output.push_str(&self.message);
        output.push('\n');

        output
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::assert_ok;

    #[test]
    fn test_webdriver_status() {
        let ready = webdriver_status(&json!({"value": {"ready": true, "message": "ChromeDriver ready"}}));
        assert!(ready.passed);
        assert_eq!(ready.message, "ChromeDriver ready");

        let busy = webdriver_status(&json!({"value": {"ready": false, "message": "session limit"}}));
        assert!(!busy.passed);
        assert!(busy.message.contains("session limit"));

        assert!(!webdriver_status(&json!({"status": 0})).passed);
    }

    #[test]
    fn test_artifacts_writable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("artifacts");

        let check = check_artifacts(&root);
        assert!(check.passed, "{}", check.message);
        assert!(root.is_dir());
        assert!(!root.join(".preflight").exists());
    }

    #[test]
    fn test_artifacts_blocked_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("artifacts");
        std::fs::write(&blocker, "not a directory").unwrap();

        assert!(!check_artifacts(&blocker).passed);
    }

    #[tokio::test]
    async fn test_unreachable_endpoints_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.base_url = "http://127.0.0.1:1".to_string();
        config.webdriver_url = "http://127.0.0.1:1/".to_string();
        config.artifacts.rebase(dir.path());

        let checker = assert_ok!(
            assert_ok!(PreFlightChecker::new(&config)).with_timeout(Duration::from_secs(2))
        );
        let result = checker.run().await;

        assert!(!result.passed);
        assert_eq!(result.checks.len(), 3);
        assert!(!result.checks[0].passed);
        assert!(!result.checks[1].passed);
        assert!(result.checks[2].passed);
        assert!(result.message.starts_with("1/3"));

        let table = result.format_table();
        assert!(table.contains("BLOCKED"));
        assert!(table.contains("✗ Console"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("ready", 10), "ready");
        assert_eq!(truncate("connection refused by host", 10), "connect...");
    }
}
