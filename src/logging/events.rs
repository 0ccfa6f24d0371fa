//! Lifecycle events
//!
//! Every event carries a `category` field so JSON logs can be filtered by
//! phase. Extra payloads pass through the sanitizer first.

use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

use super::Sanitizer;
use crate::browser::ConsoleMessage;

static SANITIZER: OnceLock<Sanitizer> = OnceLock::new();

/// Install the sanitizer used by the helpers below; first call wins
pub fn set_sanitizer(sanitizer: Sanitizer) {
    let _ = SANITIZER.set(sanitizer);
}

fn sanitized(extra: &Value) -> String {
    SANITIZER
        .get_or_init(Sanitizer::default)
        .sanitize(extra)
        .to_string()
}

pub fn test_start(name: &str, extra: &Value) {
    info!(
        category = "test_start",
        test_name = name,
        extra = %sanitized(extra),
        "Test started: {}",
        name
    );
}

pub fn test_step(name: &str, step: &str, status: &str) {
    debug!(
        category = "test_step",
        test_name = name,
        step = step,
        status = status,
        "Step '{}' {}",
        step,
        status
    );
}

pub fn test_end(name: &str, success: bool, duration_ms: u64, extra: &Value) {
    if success {
        info!(
            category = "test_end",
            test_name = name,
            success,
            duration_ms,
            extra = %sanitized(extra),
            "Test finished: {} ({}ms)",
            name,
            duration_ms
        );
    } else {
        error!(
            category = "test_end",
            test_name = name,
            success,
            duration_ms,
            extra = %sanitized(extra),
            "Test failed: {} ({}ms)",
            name,
            duration_ms
        );
    }
}

pub fn browser_action(action: &str, target: &str, extra: &Value) {
    debug!(
        category = "browser_action",
        action = action,
        target = target,
        extra = %sanitized(extra),
        "{} {}",
        action,
        target
    );
}

/// Replay a captured page console message at a matching level
pub fn browser_console(message: &ConsoleMessage) {
    match message.level.as_str() {
        "error" => error!(category = "browser_console", level_name = "error", "[console] {}", message.message),
        "warn" | "warning" => {
            warn!(category = "browser_console", level_name = "warn", "[console] {}", message.message)
        }
        "debug" => debug!(category = "browser_console", level_name = "debug", "[console] {}", message.message),
        other => info!(category = "browser_console", level_name = other, "[console] {}", message.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitized_payload() {
        let text = sanitized(&json!({ "email": "qa@example.com", "password": "pw" }));
        assert!(text.contains("qa@example.com"));
        assert!(text.contains("***SANITIZED***"));
        assert!(!text.contains("\"pw\""));
    }

    #[test]
    fn test_helpers_without_subscriber() {
        test_start("login", &json!({ "url": "http://localhost" }));
        test_step("login", "fill email", "ok");
        test_end("login", false, 12, &Value::Null);
        browser_action("click", "submit", &json!({}));
        browser_console(&ConsoleMessage {
            level: "warn".to_string(),
            message: "deprecated".to_string(),
            timestamp: String::new(),
        });
    }
}
