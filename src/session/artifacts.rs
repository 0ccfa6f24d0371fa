//! Screenshot, dump and browser log files

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    pub screenshots: PathBuf,
    pub logs: PathBuf,
    pub dumps: PathBuf,
    pub screenshots_enabled: bool,
}

/// Keep names filesystem-safe
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "artifact".to_string()
    } else {
        stem
    }
}

pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

impl ArtifactStore {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            screenshots: config.screenshots.path.clone(),
            logs: config.artifacts.logs.clone(),
            dumps: config.artifacts.dumps.clone(),
            screenshots_enabled: config.screenshots.enabled,
        }
    }

    fn write(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        let path = dir.join(file_name);
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// `<screenshots>/<name>_<yyyymmdd_HHMMSS>.png`
    pub fn save_screenshot(&self, name: &str, png: &[u8]) -> Result<PathBuf> {
        Self::write(
            &self.screenshots,
            &format!("{}_{}.png", file_stem(name), timestamp()),
            png,
        )
    }

    pub fn save_dump<T: Serialize>(&self, label: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(value).context("Failed to serialize dump")?;
        Self::write(
            &self.dumps,
            &format!("dump_{}_{}.json", file_stem(label), timestamp()),
            &json,
        )
    }

    /// `<logs>/<label>_<kind>_<timestamp>.json`
    pub fn save_log<T: Serialize>(&self, label: &str, kind: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(value).context("Failed to serialize browser log")?;
        Self::write(
            &self.logs,
            &format!("{}_{}_{}.json", file_stem(label), kind, timestamp()),
            &json,
        )
    }
}
