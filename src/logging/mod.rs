//! Logging setup
//!
//! Builds the tracing subscriber from [`LoggingSettings`]: a compact console
//! layer, and per-session text and/or JSON files that rotate by size.

pub mod events;
mod rotate;
mod sanitize;
mod session;

pub use rotate::RotatingWriter;
pub use sanitize::Sanitizer;
pub use session::{generate_session_id, SessionDir};

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{FileLogFormat, LogHandler, LogLevel, LoggingSettings};

pub const TEXT_LOG: &str = "test_execution.log";
pub const JSON_LOG: &str = "test_execution.json";

/// What [`init`] set up; keep it around for the session paths
#[derive(Debug, Default)]
pub struct LoggingHandle {
    pub session: Option<SessionDir>,
    pub files: Vec<PathBuf>,
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "console_e2e={}",
            level.to_tracing_level().as_str().to_lowercase()
        ))
    })
}

/// Install the global subscriber
pub fn init(
    settings: &LoggingSettings,
    level: LogLevel,
    logger_name: &str,
    config_snapshot: &serde_json::Value,
) -> Result<LoggingHandle> {
    events::set_sanitizer(Sanitizer::new(&settings.filters.sanitize_fields));

    let console = (!settings.enabled || settings.handlers.contains(&LogHandler::Console)).then(|| {
        fmt::layer()
            .with_target(false)
            .with_ansi(settings.console_settings.colorize)
            .compact()
    });

    let mut handle = LoggingHandle::default();
    let mut text_layer = None;
    let mut json_layer = None;

    if settings.enabled && settings.handlers.contains(&LogHandler::File) {
        let file_settings = &settings.file_settings;
        let session = SessionDir::create(
            &file_settings.directory,
            &generate_session_id(),
            logger_name,
            config_snapshot,
        )?;
        let max_bytes = file_settings.max_size_mb.saturating_mul(1024 * 1024);

        if matches!(file_settings.format, FileLogFormat::Text | FileLogFormat::Both) {
            let path = session.file(TEXT_LOG);
            let writer = RotatingWriter::new(&path, max_bytes, file_settings.rotation_count)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            text_layer = Some(fmt::layer().with_ansi(false).with_writer(writer));
            handle.files.push(path);
        }

        if matches!(file_settings.format, FileLogFormat::Json | FileLogFormat::Both) {
            let path = session.file(JSON_LOG);
            let writer = RotatingWriter::new(&path, max_bytes, file_settings.rotation_count)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            json_layer = Some(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(writer),
            );
            handle.files.push(path);
        }

        handle.session = Some(session);
    }

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console)
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(session) = &handle.session {
        tracing::debug!(session_id = %session.id, "Logging to {}", session.path.display());
    }

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_uses_crate_target() {
        std::env::remove_var("RUST_LOG");
        let filter = env_filter(LogLevel::Debug);
        assert_eq!(filter.to_string(), "console_e2e=debug");
    }
}
