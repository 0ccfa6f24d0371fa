//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{AppConfig, SuiteDefinition};
use crate::scenarios::{ScenarioDefinition, ScenarioRegistry, Step};
use crate::interact::SelectorCascade;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./console-e2e.yaml",
    "./console-e2e.yml",
    "./console-e2e.json",
    "./config.json",
    "~/.config/console-e2e/config.yaml",
];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Application settings, at the top level of the file
    #[serde(flatten)]
    pub app: AppConfig,

    /// Named suites, shadowing the predefined ones
    #[serde(default)]
    pub suites: Vec<SuiteDefinition>,

    /// Custom scenarios; a name matching a built-in replaces it
    #[serde(default)]
    pub scenarios: Vec<ScenarioDefinition>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            suites: Vec::new(),
            scenarios: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file: explicit path, `CONSOLE_E2E_CONFIG`, then
    /// the standard locations
    pub fn find(explicit: Option<&Path>, from_env: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = from_env {
            return Some(expand_path(path));
        }
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load the first config found, or defaults when there is none
    pub fn load_or_default(explicit: Option<&Path>, from_env: Option<&str>) -> Result<(Self, Option<PathBuf>)> {
        match Self::find(explicit, from_env) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        self.app.validate()?;

        for scenario in &self.scenarios {
            if scenario.name.trim().is_empty() {
                anyhow::bail!("Custom scenario with empty name");
            }
            if scenario.steps.is_empty() {
                anyhow::bail!("Scenario '{}' has no steps", scenario.name);
            }
        }

        let registry = ScenarioRegistry::new(&self.scenarios);
        for suite in &self.suites {
            if suite.rounds == 0 {
                anyhow::bail!("Suite '{}' must run at least one round", suite.name);
            }
            for key in &suite.scenarios {
                if registry.resolve(key).is_none() {
                    anyhow::bail!("Unknown scenario '{}' in suite '{}'", key, suite.name);
                }
            }
        }

        Ok(())
    }

    /// Suite by name, configured suites taking precedence
    pub fn suite(&self, name: &str) -> Option<SuiteDefinition> {
        SuiteDefinition::find(name, &self.suites)
    }

    /// Generate example configuration
    pub fn example() -> Self {
        let mut app = AppConfig::default();
        app.browser.headless = false;
        app.browser.slow_mo = 100;
        for (key, value) in [
            ("repository_prefix", "e2e_repo_"),
            ("machine_name", "rediacc11"),
            ("team_name", "Private Team"),
            ("region_name", "Default Region"),
        ] {
            app.test_data.insert(key.to_string(), value.to_string());
        }

        Self {
            version: default_version(),
            app,
            suites: vec![SuiteDefinition::new("nightly", "Nightly regression")
                .with_scenarios(["register", "login", "create_repository", "repository_up", "delete_repository"])
                .with_rounds(2)],
            scenarios: vec![ScenarioDefinition {
                name: "open_audit".to_string(),
                number: None,
                category: "Custom".to_string(),
                description: "Open the audit page and check the table renders".to_string(),
                steps: vec![
                    Step::navigate("/console/audit"),
                    Step::wait_visible(SelectorCascade::new(
                        "audit table",
                        ["[data-testid=\"audit-table\"]", ".ant-table"],
                    )),
                    Step::screenshot("audit_page"),
                ],
            }],
        }
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_example_is_valid() {
        let config = ConfigFile::example();
        assert!(config.validate().is_ok());
        assert_eq!(config.suite("nightly").unwrap().rounds, 2);
        assert!(config.suite("full_suite").is_some());
    }

    #[test]
    fn test_config_file_save_load_yaml_and_json() {
        let dir = tempdir().unwrap();
        for name in ["config.yaml", "config.json"] {
            let path = dir.path().join(name);
            let config = ConfigFile::example();
            config.save(&path).unwrap();

            let loaded = ConfigFile::load(&path).unwrap();
            assert_eq!(loaded.version, config.version);
            assert_eq!(loaded.app.browser.slow_mo, 100);
            assert_eq!(loaded.scenarios[0].steps.len(), 3);
        }
    }

    #[test]
    fn test_flat_json_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"baseUrl": "http://console.local:8080", "login": {"credentials": {"email": "qa@example.com", "password": "pw"}}}"#,
        )
        .unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.app.base_url, "http://console.local:8080");
        assert_eq!(loaded.app.login.credentials.email, "qa@example.com");
        assert!(loaded.suites.is_empty());
    }

    #[test]
    fn test_validate_unknown_scenario_in_suite() {
        let mut config = ConfigFile::default();
        config
            .suites
            .push(SuiteDefinition::new("broken", "").with_scenarios(["login", "fly_to_moon"]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fly_to_moon"));
    }

    #[test]
    fn test_validate_version() {
        let config = ConfigFile {
            version: "9.9".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_find_precedence() {
        let explicit = PathBuf::from("/tmp/explicit.yaml");
        assert_eq!(
            ConfigFile::find(Some(&explicit), Some("/tmp/env.yaml")),
            Some(explicit)
        );
        assert_eq!(
            ConfigFile::find(None, Some("/tmp/env.yaml")),
            Some(PathBuf::from("/tmp/env.yaml"))
        );
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
