//! Step DSL
//!
//! Scenarios are flat lists of steps. Every string field may contain `{name}`
//! placeholders that are rendered against the session variables right before
//! the step runs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::interact::SelectorCascade;

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Go to a path below the base URL, or an absolute URL
    Navigate { path: String },

    Click {
        target: SelectorCascade,
        #[serde(default, skip_serializing_if = "is_false")]
        optional: bool,
    },

    Fill { target: SelectorCascade, value: String },

    /// Attach a local file to a file input; relative paths resolve against
    /// the working directory
    Upload { target: SelectorCascade, file: String },

    #[serde(rename_all = "camelCase")]
    WaitVisible {
        target: SelectorCascade,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "is_false")]
        optional: bool,
    },

    #[serde(rename_all = "camelCase")]
    WaitHidden {
        target: SelectorCascade,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "is_false")]
        optional: bool,
    },

    /// Wait until the current URL matches a glob
    #[serde(rename_all = "camelCase")]
    WaitUrl {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    Pause { ms: u64 },

    Screenshot { name: String },

    /// Poll for a success or error indicator
    #[serde(rename_all = "camelCase")]
    ExpectOutcome {
        /// Extra success phrases on top of the configured ones
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        success: Vec<String>,
        /// Selectors whose appearance also counts as success
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        verify: Vec<String>,
        /// Treat an unclear outcome as a failure
        #[serde(default, skip_serializing_if = "is_false")]
        required: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Follow the Queue Item Trace dialog to a terminal state
    #[serde(rename_all = "camelCase")]
    MonitorQueue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        #[serde(default = "default_true")]
        close: bool,
    },

    /// Pick the first table row whose `column` cell is not protected and
    /// store that cell in `save_as`
    #[serde(rename_all = "camelCase")]
    PickRow {
        rows: String,
        #[serde(default)]
        column: usize,
        /// Cell values to pass over; each entry may be a comma-separated list
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        skip: Vec<String>,
        /// Selector with `{value}` that must be visible for the row to qualify
        #[serde(default, skip_serializing_if = "Option::is_none")]
        require: Option<String>,
        save_as: String,
    },

    Set { name: String, value: String },

    Dump { label: String },
}

impl Step {
    pub fn navigate(path: impl Into<String>) -> Self {
        Step::Navigate { path: path.into() }
    }

    pub fn click(target: SelectorCascade) -> Self {
        Step::Click {
            target,
            optional: false,
        }
    }

    /// Click if present, warn otherwise
    pub fn click_optional(target: SelectorCascade) -> Self {
        Step::Click {
            target,
            optional: true,
        }
    }

    pub fn fill(target: SelectorCascade, value: impl Into<String>) -> Self {
        Step::Fill {
            target,
            value: value.into(),
        }
    }

    pub fn upload(target: SelectorCascade, file: impl Into<String>) -> Self {
        Step::Upload {
            target,
            file: file.into(),
        }
    }

    pub fn wait_visible(target: SelectorCascade) -> Self {
        Step::WaitVisible {
            target,
            timeout_ms: None,
            optional: false,
        }
    }

    pub fn wait_hidden(target: SelectorCascade) -> Self {
        Step::WaitHidden {
            target,
            timeout_ms: None,
            optional: true,
        }
    }

    pub fn wait_url(pattern: impl Into<String>) -> Self {
        Step::WaitUrl {
            pattern: pattern.into(),
            timeout_ms: None,
        }
    }

    pub fn pause(ms: u64) -> Self {
        Step::Pause { ms }
    }

    pub fn screenshot(name: impl Into<String>) -> Self {
        Step::Screenshot { name: name.into() }
    }

    pub fn expect<S: Into<String>>(success: impl IntoIterator<Item = S>) -> Self {
        Step::ExpectOutcome {
            success: success.into_iter().map(Into::into).collect(),
            verify: Vec::new(),
            required: false,
            timeout_ms: None,
        }
    }

    /// Success when a phrase shows up or any `verify` selector becomes visible
    pub fn expect_or_verify<S: Into<String>, V: Into<String>>(
        success: impl IntoIterator<Item = S>,
        verify: impl IntoIterator<Item = V>,
    ) -> Self {
        Step::ExpectOutcome {
            success: success.into_iter().map(Into::into).collect(),
            verify: verify.into_iter().map(Into::into).collect(),
            required: false,
            timeout_ms: None,
        }
    }

    pub fn monitor_queue() -> Self {
        Step::MonitorQueue {
            timeout_ms: None,
            close: true,
        }
    }

    pub fn pick_row(
        rows: impl Into<String>,
        column: usize,
        skip: &[&str],
        require: Option<&str>,
        save_as: impl Into<String>,
    ) -> Self {
        Step::PickRow {
            rows: rows.into(),
            column,
            skip: skip.iter().map(|s| s.to_string()).collect(),
            require: require.map(str::to_string),
            save_as: save_as.into(),
        }
    }

    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Step::Set {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn dump(label: impl Into<String>) -> Self {
        Step::Dump {
            label: label.into(),
        }
    }

    pub fn with_timeout(mut self, ms: u64) -> Self {
        match &mut self {
            Step::WaitVisible { timeout_ms, .. }
            | Step::WaitHidden { timeout_ms, .. }
            | Step::WaitUrl { timeout_ms, .. }
            | Step::ExpectOutcome { timeout_ms, .. }
            | Step::MonitorQueue { timeout_ms, .. } => *timeout_ms = Some(ms),
            _ => {}
        }
        self
    }

    /// Unclear outcome fails the scenario
    pub fn required(mut self) -> Self {
        if let Step::ExpectOutcome { required, .. } = &mut self {
            *required = true;
        }
        self
    }

    /// Missing element only warns
    pub fn optional(mut self) -> Self {
        match &mut self {
            Step::Click { optional, .. }
            | Step::WaitVisible { optional, .. }
            | Step::WaitHidden { optional, .. } => *optional = true,
            _ => {}
        }
        self
    }

    pub fn action(&self) -> &'static str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::Click { .. } => "click",
            Step::Fill { .. } => "fill",
            Step::Upload { .. } => "upload",
            Step::WaitVisible { .. } => "wait_visible",
            Step::WaitHidden { .. } => "wait_hidden",
            Step::WaitUrl { .. } => "wait_url",
            Step::Pause { .. } => "pause",
            Step::Screenshot { .. } => "screenshot",
            Step::ExpectOutcome { .. } => "expect_outcome",
            Step::MonitorQueue { .. } => "monitor_queue",
            Step::PickRow { .. } => "pick_row",
            Step::Set { .. } => "set",
            Step::Dump { .. } => "dump",
        }
    }

    /// One-line description used in logs and step timings
    pub fn describe(&self) -> String {
        match self {
            Step::Navigate { path } => format!("navigate to {path}"),
            Step::Click { target, .. } => format!("click {}", target.description),
            Step::Fill { target, .. } => format!("fill {}", target.description),
            Step::Upload { target, file } => format!("upload {file} to {}", target.description),
            Step::WaitVisible { target, .. } => format!("wait for {}", target.description),
            Step::WaitHidden { target, .. } => {
                format!("wait for {} to close", target.description)
            }
            Step::WaitUrl { pattern, .. } => format!("wait for URL {pattern}"),
            Step::Pause { ms } => format!("pause {ms}ms"),
            Step::Screenshot { name } => format!("screenshot {name}"),
            Step::ExpectOutcome { .. } => "check outcome".to_string(),
            Step::MonitorQueue { .. } => "monitor queue item".to_string(),
            Step::PickRow { save_as, .. } => format!("pick row into {save_as}"),
            Step::Set { name, .. } => format!("set {name}"),
            Step::Dump { label } => format!("dump {label}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_steps() {
        let yaml = r#"
- action: navigate
  path: /console/resources
- action: click
  target:
    description: create button
    selectors: ["[data-testid=\"resources-create-machine-button\"]"]
  optional: true
- action: wait_visible
  target:
    description: modal
    selectors: [".ant-modal"]
  timeoutMs: 3000
- action: expect_outcome
  success: ["created"]
  required: true
- action: monitor_queue
- action: pick_row
  rows: ".ant-table-tbody tr"
  column: 1
  skip: ["{protected_users}"]
  saveAs: target_user
"#;
        let steps: Vec<Step> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0], Step::navigate("/console/resources"));
        assert!(matches!(&steps[1], Step::Click { optional: true, .. }));
        assert!(matches!(
            &steps[2],
            Step::WaitVisible {
                timeout_ms: Some(3000),
                optional: false,
                ..
            }
        ));
        assert_eq!(steps[3], Step::expect(["created"]).required());
        assert_eq!(steps[4], Step::monitor_queue());
        match &steps[5] {
            Step::PickRow {
                column,
                save_as,
                skip,
                require,
                ..
            } => {
                assert_eq!(*column, 1);
                assert_eq!(save_as, "target_user");
                assert_eq!(skip, &vec!["{protected_users}".to_string()]);
                assert!(require.is_none());
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_serialization_skips_defaults() {
        let json = serde_json::to_value(Step::click(SelectorCascade::new("ok", ["button"]))).unwrap();
        assert_eq!(json["action"], "click");
        assert!(json.get("optional").is_none());

        let json = serde_json::to_value(Step::wait_url("**/dashboard").with_timeout(500)).unwrap();
        assert_eq!(json["timeoutMs"], 500);
    }

    #[test]
    fn test_describe() {
        let step = Step::fill(SelectorCascade::new("repository name", ["input"]), "{session_repo}");
        assert_eq!(step.describe(), "fill repository name");
        assert_eq!(step.action(), "fill");
        assert_eq!(Step::pause(200).describe(), "pause 200ms");
    }
}
