//! Per-run log directory
//!
//! Every invocation gets `<base>/sessions/<session_id>/` with a
//! `session_info.json` describing the run, and `<base>/latest` points at it.

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct SessionDir {
    pub id: String,
    pub path: PathBuf,
}

#[derive(Serialize)]
struct SessionInfo<'a> {
    session_id: &'a str,
    start_time: String,
    logger_name: &'a str,
    config: &'a serde_json::Value,
}

/// `session_<yyyymmdd_HHMMSS>_<pid>`
pub fn generate_session_id() -> String {
    format!(
        "session_{}_{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        std::process::id()
    )
}

impl SessionDir {
    pub fn create(
        base: &Path,
        id: &str,
        logger_name: &str,
        config: &serde_json::Value,
    ) -> Result<Self> {
        let path = base.join("sessions").join(id);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create log directory: {}", path.display()))?;

        let info = SessionInfo {
            session_id: id,
            start_time: Local::now().to_rfc3339(),
            logger_name,
            config,
        };
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize session info")?;
        fs::write(path.join("session_info.json"), json)
            .context("Failed to write session_info.json")?;

        link_latest(base, id);

        Ok(Self {
            id: id.to_string(),
            path,
        })
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

#[cfg(unix)]
fn link_latest(base: &Path, id: &str) {
    let link = base.join("latest");
    if fs::symlink_metadata(&link).is_ok() {
        if let Err(e) = fs::remove_file(&link) {
            tracing::debug!("Could not replace latest link: {}", e);
            return;
        }
    }
    let target = Path::new("sessions").join(id);
    if let Err(e) = std::os::unix::fs::symlink(target, &link) {
        tracing::debug!("Could not create latest link: {}", e);
    }
}

#[cfg(not(unix))]
fn link_latest(_base: &Path, _id: &str) {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        assert!(id.starts_with("session_"));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
        assert_eq!(parts[3], std::process::id().to_string());
    }

    #[test]
    fn test_create_writes_info_and_link() {
        let dir = tempdir().unwrap();
        let session = SessionDir::create(
            dir.path(),
            "session_20240101_120000_42",
            "SuiteRunner",
            &json!({ "baseUrl": "http://localhost" }),
        )
        .unwrap();

        let info: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(session.file("session_info.json")).unwrap())
                .unwrap();
        assert_eq!(info["session_id"], "session_20240101_120000_42");
        assert_eq!(info["logger_name"], "SuiteRunner");
        assert_eq!(info["config"]["baseUrl"], "http://localhost");

        #[cfg(unix)]
        {
            let latest = dir.path().join("latest");
            assert!(latest.join("session_info.json").exists());

            SessionDir::create(dir.path(), "session_20240101_130000_42", "SuiteRunner", &json!({}))
                .unwrap();
            assert_eq!(
                fs::read_link(&latest).unwrap(),
                Path::new("sessions").join("session_20240101_130000_42")
            );
        }
    }
}
