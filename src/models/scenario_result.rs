//! Scenario result models
//!
//! Outcome of one scenario run and the per-round summary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Scenario execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Pass,
    Fail,
    /// Ran to the end but no success indicator was recognised
    Unclear,
    Skip,
    Error,
}

impl ScenarioStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            ScenarioStatus::Pass => "✓",
            ScenarioStatus::Fail => "✗",
            ScenarioStatus::Unclear => "?",
            ScenarioStatus::Skip => "○",
            ScenarioStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScenarioStatus::Pass)
    }

    /// Whether this status makes the run exit non-zero
    pub fn is_failure(&self, strict: bool) -> bool {
        match self {
            ScenarioStatus::Fail | ScenarioStatus::Error => true,
            ScenarioStatus::Unclear => strict,
            ScenarioStatus::Pass | ScenarioStatus::Skip => false,
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Pass => write!(f, "PASS"),
            ScenarioStatus::Fail => write!(f, "FAIL"),
            ScenarioStatus::Unclear => write!(f, "UNCLEAR"),
            ScenarioStatus::Skip => write!(f, "SKIP"),
            ScenarioStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of a single scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u16>,
    #[serde(default)]
    pub category: String,
    pub status: ScenarioStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<PathBuf>,
    /// Reported but never part of the verdict
    #[serde(default, skip_serializing_if = "is_false")]
    pub advisory: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ScenarioResult {
    fn new(
        scenario: impl Into<String>,
        status: ScenarioStatus,
        duration_ms: u64,
        message: Option<String>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            number: None,
            category: String::new(),
            status,
            duration_ms,
            message,
            details: None,
            screenshots: Vec::new(),
            advisory: false,
        }
    }

    pub fn pass(scenario: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(scenario, ScenarioStatus::Pass, duration_ms, None)
    }

    pub fn fail(scenario: impl Into<String>, duration_ms: u64, message: impl Into<String>) -> Self {
        Self::new(scenario, ScenarioStatus::Fail, duration_ms, Some(message.into()))
    }

    pub fn unclear(
        scenario: impl Into<String>,
        duration_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::new(scenario, ScenarioStatus::Unclear, duration_ms, Some(message.into()))
    }

    pub fn skip(scenario: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(scenario, ScenarioStatus::Skip, 0, Some(reason.into()))
    }

    pub fn error(scenario: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(scenario, ScenarioStatus::Error, 0, Some(error.into()))
    }

    pub fn with_number(mut self, number: Option<u16>) -> Self {
        self.number = number;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn advisory(mut self) -> Self {
        self.advisory = true;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_screenshots(mut self, screenshots: Vec<PathBuf>) -> Self {
        self.screenshots = screenshots;
        self
    }

    /// `#6 Create Repository` or just the name for custom scenarios
    pub fn label(&self) -> String {
        match self.number {
            Some(n) => format!("#{n} {}", self.scenario),
            None => self.scenario.clone(),
        }
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.label(),
            self.duration_ms
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Summary of one suite round
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub round: u32,
    pub suite: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    #[serde(default)]
    pub unclear: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total_duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteSummary {
    pub fn new(round: u32, suite: impl Into<String>, results: Vec<ScenarioResult>) -> Self {
        let count = |status: ScenarioStatus| results.iter().filter(|r| r.status == status).count();

        Self {
            round,
            suite: suite.into(),
            total: results.len(),
            passed: count(ScenarioStatus::Pass),
            failed: count(ScenarioStatus::Fail),
            unclear: count(ScenarioStatus::Unclear),
            skipped: count(ScenarioStatus::Skip),
            errors: count(ScenarioStatus::Error),
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            results,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.passed == self.total
    }

    /// No Fail or Error; Unclear counts as a failure only when `strict`.
    /// Advisory results are left out.
    pub fn is_successful(&self, strict: bool) -> bool {
        !self
            .results
            .iter()
            .any(|r| !r.advisory && r.status.is_failure(strict))
    }
}

impl fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Round {} - {}", self.round, self.suite)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Unclear: {} | Skip: {} | Error: {}",
            self.total, self.passed, self.failed, self.unclear, self.skipped, self.errors
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_creation() {
        let result = ScenarioResult::pass("Login", 100).with_number(Some(2));
        assert!(result.status.is_success());
        assert_eq!(result.duration_ms, 100);
        assert_eq!(result.label(), "#2 Login");
        assert_eq!(result.to_string(), "✓ #2 Login [100ms]");
    }

    #[test]
    fn test_failure_policy() {
        assert!(ScenarioStatus::Fail.is_failure(false));
        assert!(ScenarioStatus::Error.is_failure(false));
        assert!(!ScenarioStatus::Unclear.is_failure(false));
        assert!(ScenarioStatus::Unclear.is_failure(true));
        assert!(!ScenarioStatus::Skip.is_failure(true));
    }

    #[test]
    fn test_round_summary() {
        let results = vec![
            ScenarioResult::pass("Login", 100),
            ScenarioResult::unclear("Create Repository", 50, "no confirmation seen"),
            ScenarioResult::skip("Delete User", "no suitable target"),
        ];

        let summary = SuiteSummary::new(1, "smoke", results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.unclear, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total_duration_ms, 150);
        assert!(summary.is_successful(false));
        assert!(!summary.is_successful(true));
        assert!(!summary.is_all_passed());
    }

    #[test]
    fn test_advisory_unclear_does_not_fail_strict() {
        let results = vec![
            ScenarioResult::unclear("Register", 80, "already registered").advisory(),
            ScenarioResult::pass("Login", 100),
        ];

        let summary = SuiteSummary::new(1, "full_suite", results);
        assert_eq!(summary.unclear, 1);
        assert!(summary.is_successful(true));

        let json = serde_json::to_string(&summary.results[1]).unwrap();
        assert!(!json.contains("advisory"));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ScenarioStatus::Unclear).unwrap();
        assert_eq!(json, "\"unclear\"");
    }
}
