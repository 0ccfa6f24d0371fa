//! Console session
//!
//! Wraps one browser page together with the run configuration, the template
//! variables shared by all scenarios of a round, and the artifact store.

mod artifacts;
mod login;

pub use artifacts::{timestamp, ArtifactStore};
pub use login::LoginError;

use anyhow::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::browser::{BrowserResult, Page, Selector};
use crate::config::AppConfig;
use crate::logging::events;

const BODY_EXCERPT: usize = 2000;

pub struct ConsoleSession {
    page: Arc<dyn Page>,
    config: Arc<AppConfig>,
    artifacts: ArtifactStore,
    vars: BTreeMap<String, String>,
    captured: Vec<PathBuf>,
}

/// Variables every session starts with; config `testData` overrides them
fn default_vars(stamp: &str) -> BTreeMap<String, String> {
    [
        ("repository_prefix", "e2e_repo_".to_string()),
        ("machine_name", "rediacc11".to_string()),
        ("team_name", "Private Team".to_string()),
        ("repository_size", "1G".to_string()),
        ("repository_password", "Test@12345".to_string()),
        ("user_password", "Test@12345".to_string()),
        ("new_password", "Admin@12345".to_string()),
        ("activation_code", "111111".to_string()),
        ("machine_ip", "192.168.111.11".to_string()),
        ("machine_user", "rediacc".to_string()),
        ("storage_config", "conf.conf".to_string()),
        ("storage_name", "microsoft".to_string()),
        ("protected_users", "admin@rediacc.io".to_string()),
        ("protected_teams", "Private Team".to_string()),
        ("protected_groups", "Administrators,Users".to_string()),
        ("protected_bridges", "Global Bridges".to_string()),
        ("register_company", format!("E2E Company {stamp}")),
        ("register_email", format!("e2e_owner_{stamp}@rediacc.io")),
        ("session_machine", format!("e2e_machine_{stamp}")),
        ("session_user", format!("e2e_user_{stamp}@rediacc.io")),
        ("session_team", format!("e2e_team_{stamp}")),
        ("session_group", format!("e2e_group_{stamp}")),
        ("session_bridge", format!("e2e_bridge_{stamp}")),
        ("session_region", format!("e2e_region_{stamp}")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl ConsoleSession {
    pub fn new(page: Arc<dyn Page>, config: Arc<AppConfig>) -> Self {
        let stamp = timestamp();
        let mut vars = default_vars(&stamp);
        vars.extend(config.test_data.clone());

        let prefix = vars
            .get("repository_prefix")
            .cloned()
            .unwrap_or_default();
        vars.insert("session_repo".to_string(), format!("{prefix}{stamp}"));
        vars.insert("email".to_string(), config.login.credentials.email.clone());
        vars.insert("password".to_string(), config.login.credentials.password.clone());
        vars.insert("base_url".to_string(), config.base_url.clone());

        info!("Session repository name: {}", vars["session_repo"]);

        Self {
            page,
            artifacts: ArtifactStore::from_config(&config),
            config,
            vars,
            captured: Vec::new(),
        }
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    /// Swap in a fresh page after the old one was closed
    pub fn replace_page(&mut self, page: Arc<dyn Page>) {
        self.page = page;
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Substitute `{name}` placeholders; `{timestamp}` is fresh on each call
    /// and unknown placeholders are left as written
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..name_len];

            if !name.is_empty() && after[name_len..].starts_with('}') {
                match name {
                    "timestamp" => out.push_str(&timestamp()),
                    _ => match self.vars.get(name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    },
                }
                rest = &after[name_len + 1..];
            } else {
                out.push('{');
                rest = after;
            }
        }

        out.push_str(rest);
        out
    }

    pub async fn navigate(&self, path: &str) -> BrowserResult<()> {
        let url = self.config.url_for(&self.render(path));
        events::browser_action("navigate", &url, &Value::Null);
        self.page.goto(&url).await
    }

    /// Screenshot into the artifacts directory; failures only warn
    pub async fn screenshot(&mut self, name: &str) -> Option<PathBuf> {
        if !self.artifacts.screenshots_enabled {
            return None;
        }
        let name = self.render(name);
        let png = match self.page.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                warn!("Screenshot '{}' failed: {}", name, e);
                return None;
            }
        };
        match self.artifacts.save_screenshot(&name, &png) {
            Ok(path) => {
                info!("Screenshot saved: {}", path.display());
                self.captured.push(path.clone());
                Some(path)
            }
            Err(e) => {
                warn!("Could not save screenshot '{}': {:#}", name, e);
                None
            }
        }
    }

    /// Screenshots taken since the last call
    pub fn take_screenshots(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.captured)
    }

    /// Debug snapshot of the page state
    pub async fn dump(&self, label: &str, extra: Value) -> Result<PathBuf> {
        let page = self.page();
        let url = page.current_url().await.unwrap_or_else(|e| format!("<{e}>"));
        let title = page.title().await.unwrap_or_default();
        let html_length = page.content().await.map(|html| html.len()).unwrap_or(0);
        let body: String = page
            .body_text()
            .await
            .unwrap_or_default()
            .chars()
            .take(BODY_EXCERPT)
            .collect();

        let mut dialogs = Vec::new();
        for raw in [".ant-modal", "[role='dialog']"] {
            if let Ok(selector) = Selector::parse(raw) {
                if let Ok(texts) = page.texts(&selector).await {
                    dialogs.extend(texts);
                }
            }
        }

        let console = page.console_messages().await.unwrap_or_default();
        let network = page.network_entries().await.unwrap_or_default();

        let dump = json!({
            "label": label,
            "timestamp": chrono::Local::now().to_rfc3339(),
            "url": url,
            "title": title,
            "htmlLength": html_length,
            "bodyExcerpt": body,
            "visibleDialogs": dialogs,
            "consoleMessages": console,
            "networkEntries": network,
            "extra": extra,
        });

        let path = self.artifacts.save_dump(label, &dump)?;
        info!("Debug dump written: {}", path.display());
        Ok(path)
    }

    /// Persist console and network logs, replaying console messages into the
    /// tracing stream
    pub async fn save_browser_logs(&self, label: &str) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        match self.page.console_messages().await {
            Ok(messages) => {
                for message in &messages {
                    events::browser_console(message);
                }
                written.push(self.artifacts.save_log(label, "console", &messages)?);
            }
            Err(e) => debug!("Console messages unavailable: {}", e),
        }

        match self.page.network_entries().await {
            Ok(entries) => written.push(self.artifacts.save_log(label, "network", &entries)?),
            Err(e) => debug!("Network entries unavailable: {}", e),
        }

        Ok(written)
    }
}
