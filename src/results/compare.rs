//! Run comparison
//!
//! Compare two stored runs of a suite scenario by scenario, using the
//! status each scenario had in the last round of its run.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{ScenarioResult, ScenarioStatus};
use crate::results::storage::StoredRun;

/// How a scenario moved between the baseline and the current run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Passed before, fails or errors now
    Regression,
    /// Failed or errored before, passes now
    Fix,
    Unchanged,
    /// Any other status change, e.g. pass to unclear
    Changed,
    Added,
    Removed,
}

impl ChangeKind {
    fn classify(baseline: Option<ScenarioStatus>, current: Option<ScenarioStatus>) -> Self {
        let broken = |s: ScenarioStatus| matches!(s, ScenarioStatus::Fail | ScenarioStatus::Error);
        match (baseline, current) {
            (None, _) => ChangeKind::Added,
            (_, None) => ChangeKind::Removed,
            (Some(before), Some(after)) if before == after => ChangeKind::Unchanged,
            (Some(ScenarioStatus::Pass), Some(after)) if broken(after) => ChangeKind::Regression,
            (Some(before), Some(ScenarioStatus::Pass)) if broken(before) => ChangeKind::Fix,
            _ => ChangeKind::Changed,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ChangeKind::Regression => "✗",
            ChangeKind::Fix => "✓",
            ChangeKind::Unchanged => "=",
            ChangeKind::Changed => "~",
            ChangeKind::Added => "+",
            ChangeKind::Removed => "-",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::Regression => "regression",
            ChangeKind::Fix => "fix",
            ChangeKind::Unchanged => "unchanged",
            ChangeKind::Changed => "changed",
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
        };
        f.write_str(label)
    }
}

/// One scenario in both runs
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioChange {
    pub scenario: String,
    pub baseline: Option<ScenarioStatus>,
    pub current: Option<ScenarioStatus>,
    pub kind: ChangeKind,
    /// Current minus baseline duration
    pub duration_delta_ms: Option<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunComparison {
    pub suite: String,
    pub baseline_id: String,
    pub current_id: String,
    pub changes: Vec<ScenarioChange>,
    pub pass_rate_delta: f64,
}

impl RunComparison {
    pub fn of_kind(&self, kind: ChangeKind) -> Vec<&ScenarioChange> {
        self.changes.iter().filter(|c| c.kind == kind).collect()
    }

    pub fn regressions(&self) -> Vec<&ScenarioChange> {
        self.of_kind(ChangeKind::Regression)
    }

    pub fn fixes(&self) -> Vec<&ScenarioChange> {
        self.of_kind(ChangeKind::Fix)
    }

    pub fn has_regressions(&self) -> bool {
        self.changes.iter().any(|c| c.kind == ChangeKind::Regression)
    }
}

/// Final-round results keyed by scenario label, in run order
fn last_results(run: &StoredRun) -> Vec<(String, &ScenarioResult)> {
    run.summaries
        .last()
        .map(|summary| summary.results.iter().map(|r| (r.label(), r)).collect())
        .unwrap_or_default()
}

fn pass_rate(run: &StoredRun) -> f64 {
    run.aggregate
        .as_ref()
        .map(|a| a.avg_pass_rate)
        .or_else(|| run.summaries.last().map(|s| s.pass_rate()))
        .unwrap_or(0.0)
}

/// Run comparator
pub struct RunComparator;

impl RunComparator {
    pub fn compare(baseline: &StoredRun, current: &StoredRun) -> RunComparison {
        let before: BTreeMap<String, &ScenarioResult> = last_results(baseline).into_iter().collect();
        let after = last_results(current);

        let mut changes: Vec<ScenarioChange> = after
            .iter()
            .map(|(label, result)| {
                let previous = before.get(label);
                ScenarioChange {
                    scenario: label.clone(),
                    baseline: previous.map(|r| r.status),
                    current: Some(result.status),
                    kind: ChangeKind::classify(previous.map(|r| r.status), Some(result.status)),
                    duration_delta_ms: previous
                        .map(|r| result.duration_ms as i64 - r.duration_ms as i64),
                }
            })
            .collect();

        for (label, result) in last_results(baseline) {
            if !after.iter().any(|(l, _)| *l == label) {
                changes.push(ScenarioChange {
                    scenario: label,
                    baseline: Some(result.status),
                    current: None,
                    kind: ChangeKind::Removed,
                    duration_delta_ms: None,
                });
            }
        }

        RunComparison {
            suite: current.suite.clone(),
            baseline_id: baseline.id.clone(),
            current_id: current.id.clone(),
            changes,
            pass_rate_delta: pass_rate(current) - pass_rate(baseline),
        }
    }
}

/// Comparison report formatter
pub struct ComparisonFormatter;

impl ComparisonFormatter {
    pub fn format_table(comparison: &RunComparison) -> String {
        let status = |s: Option<ScenarioStatus>| s.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        let mut output = String::new();

        output.push_str("\n╔════════════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║ {} : {} -> {}\n",
            comparison.suite, comparison.baseline_id, comparison.current_id
        ));
        output.push_str("╚════════════════════════════════════════════════════════════════════╝\n");

        for change in &comparison.changes {
            let delta = change
                .duration_delta_ms
                .map(|d| format!("{d:+}ms"))
                .unwrap_or_default();
            output.push_str(&format!(
                "  {} {:32} {:>7} -> {:<7} {:>10}\n",
                change.kind.symbol(),
                change.scenario,
                status(change.baseline),
                status(change.current),
                delta
            ));
        }

        output.push_str("──────────────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "  Regressions: {} | Fixes: {} | Changed: {} | Added: {} | Removed: {}\n",
            comparison.regressions().len(),
            comparison.fixes().len(),
            comparison.of_kind(ChangeKind::Changed).len(),
            comparison.of_kind(ChangeKind::Added).len(),
            comparison.of_kind(ChangeKind::Removed).len()
        ));
        output.push_str(&format!(
            "  Pass Rate Delta: {:+.1}%\n",
            comparison.pass_rate_delta
        ));

        output
    }

    pub fn format_json(comparison: &RunComparison) -> String {
        serde_json::to_string_pretty(comparison).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::storage::tests::sample_run;

    #[test]
    fn test_classify() {
        use ScenarioStatus::*;
        assert_eq!(ChangeKind::classify(Some(Pass), Some(Fail)), ChangeKind::Regression);
        assert_eq!(ChangeKind::classify(Some(Pass), Some(Error)), ChangeKind::Regression);
        assert_eq!(ChangeKind::classify(Some(Error), Some(Pass)), ChangeKind::Fix);
        assert_eq!(ChangeKind::classify(Some(Pass), Some(Unclear)), ChangeKind::Changed);
        assert_eq!(ChangeKind::classify(Some(Skip), Some(Skip)), ChangeKind::Unchanged);
        assert_eq!(ChangeKind::classify(None, Some(Pass)), ChangeKind::Added);
        assert_eq!(ChangeKind::classify(Some(Pass), None), ChangeKind::Removed);
    }

    #[test]
    fn test_compare_runs() {
        use ScenarioStatus::*;
        let baseline = sample_run(&[
            ("Login", Pass),
            ("Create Team", Pass),
            ("Delete Team", Fail),
            ("Configure Vault", Unclear),
        ]);
        let current = sample_run(&[
            ("Login", Pass),
            ("Create Team", Error),
            ("Delete Team", Pass),
            ("Create Region", Pass),
        ]);

        let comparison = RunComparator::compare(&baseline, &current);

        assert_eq!(comparison.changes.len(), 5);
        assert!(comparison.has_regressions());
        assert_eq!(comparison.regressions()[0].scenario, "Create Team");
        assert_eq!(comparison.fixes()[0].scenario, "Delete Team");
        assert_eq!(comparison.of_kind(ChangeKind::Added)[0].scenario, "Create Region");
        assert_eq!(comparison.of_kind(ChangeKind::Removed)[0].scenario, "Configure Vault");
        assert_eq!(comparison.of_kind(ChangeKind::Unchanged).len(), 1);
        assert!((comparison.pass_rate_delta - 25.0).abs() < 0.01);

        let table = ComparisonFormatter::format_table(&comparison);
        assert!(table.contains("Regressions: 1 | Fixes: 1"));
        let json: serde_json::Value =
            serde_json::from_str(&ComparisonFormatter::format_json(&comparison)).unwrap();
        assert_eq!(json["changes"][1]["kind"], "regression");
    }
}
