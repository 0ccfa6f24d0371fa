//! Report generation for stored runs
//!
//! Plain text for terminals, Markdown for CI summaries and pull requests.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::{self, Write};

use crate::models::ScenarioStatus;
use crate::results::compare::{ComparisonFormatter, RunComparator, RunComparison};
use crate::results::storage::{ResultsStorage, StoredRun};

/// Report generator
pub struct ReportGenerator {
    storage: ResultsStorage,
}

impl ReportGenerator {
    pub fn new(storage: ResultsStorage) -> Self {
        Self { storage }
    }

    /// Report for the newest run of a suite
    pub fn latest_report(&self, suite: &str, format: ReportFormat) -> Result<String> {
        let run = self
            .storage
            .latest(suite)?
            .with_context(|| format!("No stored runs for suite '{suite}'"))?;
        Ok(self.run_report(&run, format))
    }

    pub fn run_report(&self, run: &StoredRun, format: ReportFormat) -> String {
        let mut output = String::new();
        let written = match format {
            ReportFormat::Text => write_text_report(&mut output, run),
            ReportFormat::Markdown => write_markdown_report(&mut output, run),
        };
        debug_assert!(written.is_ok());
        output
    }

    /// Compare the two newest runs of a suite
    pub fn latest_comparison(&self, suite: &str, format: ReportFormat) -> Result<String> {
        let runs = self.storage.load_suite(suite)?;
        match runs.as_slice() {
            [current, baseline, ..] => Ok(self.comparison_report(baseline, current, format)),
            _ => anyhow::bail!("Suite '{suite}' needs at least two stored runs to compare"),
        }
    }

    pub fn comparison_report(
        &self,
        baseline: &StoredRun,
        current: &StoredRun,
        format: ReportFormat,
    ) -> String {
        let comparison = RunComparator::compare(baseline, current);
        match format {
            ReportFormat::Text => ComparisonFormatter::format_table(&comparison),
            ReportFormat::Markdown => {
                let mut output = String::new();
                let written = write_markdown_comparison(&mut output, &comparison);
                debug_assert!(written.is_ok());
                output
            }
        }
    }
}

fn write_text_report(output: &mut String, run: &StoredRun) -> fmt::Result {
    writeln!(output, "\n{:=^70}", " Console E2E Report ")?;
    writeln!(output)?;
    writeln!(output, "Suite: {}", run.suite)?;
    writeln!(output, "Console: {}", run.base_url)?;
    writeln!(output, "Run ID: {}", run.id)?;
    writeln!(output, "Started: {}", format_datetime(&run.started_at))?;
    writeln!(output, "Completed: {}", format_datetime(&run.completed_at))?;
    writeln!(output, "Rounds: {}", run.rounds)?;
    writeln!(
        output,
        "Browser: {} ({})",
        run.environment.browser,
        if run.environment.headless { "headless" } else { "headed" }
    )?;
    writeln!(output, "Result: {}", verdict(run))?;
    writeln!(output)?;

    if let Some(agg) = &run.aggregate {
        writeln!(output, "{:-^70}", " Aggregate Statistics ")?;
        writeln!(output, "Average Pass Rate: {:.1}%", agg.avg_pass_rate)?;
        writeln!(
            output,
            "Pass Rate Range: {:.1}% - {:.1}%",
            agg.min_pass_rate, agg.max_pass_rate
        )?;
        writeln!(output, "Average Duration: {}ms", agg.avg_duration_ms)?;
        writeln!(output, "Total Duration: {}ms", agg.total_duration_ms)?;
        writeln!(output)?;

        writeln!(output, "{:-^70}", " Per-Scenario Statistics ")?;
        writeln!(
            output,
            "{:<30} {:>8} {:>8} {:>8} {:>8}",
            "Scenario", "Pass%", "Avg(ms)", "Min(ms)", "Max(ms)"
        )?;
        writeln!(output, "{:-<70}", "")?;
        for (name, stats) in &agg.scenario_stats {
            writeln!(
                output,
                "{:<30} {:>7.1}% {:>8} {:>8} {:>8}",
                truncate(name, 30),
                stats.pass_rate,
                stats.avg_duration_ms,
                stats.min_duration_ms,
                stats.max_duration_ms
            )?;
        }
    }

    writeln!(output, "\n{:-^70}", " Round Details ")?;
    for summary in &run.summaries {
        writeln!(
            output,
            "\nRound {}: {}/{} passed ({:.1}%) in {}ms",
            summary.round,
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.total_duration_ms
        )?;
        for result in summary.results.iter().filter(|r| !r.status.is_success()) {
            writeln!(output, "  {result}")?;
        }
    }

    writeln!(output, "\n{:=^70}", "")
}

fn write_markdown_report(output: &mut String, run: &StoredRun) -> fmt::Result {
    writeln!(output, "# Console E2E Report\n")?;
    writeln!(output, "## Summary\n")?;
    writeln!(output, "| Property | Value |")?;
    writeln!(output, "|----------|-------|")?;
    writeln!(output, "| Suite | {} |", run.suite)?;
    writeln!(output, "| Console | {} |", run.base_url)?;
    writeln!(output, "| Run ID | `{}` |", run.id)?;
    writeln!(output, "| Started | {} |", format_datetime(&run.started_at))?;
    writeln!(output, "| Completed | {} |", format_datetime(&run.completed_at))?;
    writeln!(output, "| Rounds | {} |", run.rounds)?;
    writeln!(output, "| Result | {} |", verdict(run))?;

    if let Some(agg) = &run.aggregate {
        writeln!(output, "\n## Statistics\n")?;
        writeln!(output, "- **Average Pass Rate:** {:.1}%", agg.avg_pass_rate)?;
        writeln!(
            output,
            "- **Pass Rate Range:** {:.1}% - {:.1}%",
            agg.min_pass_rate, agg.max_pass_rate
        )?;
        writeln!(output, "- **Total Duration:** {}ms", agg.total_duration_ms)?;
    }

    for summary in &run.summaries {
        writeln!(output, "\n## Round {}\n", summary.round)?;
        writeln!(output, "| # | Scenario | Status | Duration | Message |")?;
        writeln!(output, "|---|----------|--------|----------|---------|")?;
        for result in &summary.results {
            writeln!(
                output,
                "| {} | {} | {} {} | {}ms | {} |",
                result.number.map(|n| n.to_string()).unwrap_or_default(),
                escape_cell(&result.scenario),
                result.status.symbol(),
                result.status,
                result.duration_ms,
                escape_cell(result.message.as_deref().unwrap_or(""))
            )?;
        }
    }

    let screenshots: Vec<_> = run
        .summaries
        .iter()
        .flat_map(|s| s.results.iter())
        .filter(|r| matches!(r.status, ScenarioStatus::Fail | ScenarioStatus::Error))
        .flat_map(|r| r.screenshots.iter())
        .collect();
    if !screenshots.is_empty() {
        writeln!(output, "\n## Failure Screenshots\n")?;
        for path in screenshots {
            writeln!(output, "- `{}`", path.display())?;
        }
    }

    Ok(())
}

fn write_markdown_comparison(output: &mut String, comparison: &RunComparison) -> fmt::Result {
    writeln!(output, "# Run Comparison: {}\n", comparison.suite)?;
    writeln!(
        output,
        "`{}` → `{}` (pass rate {:+.1}%)\n",
        comparison.baseline_id, comparison.current_id, comparison.pass_rate_delta
    )?;
    writeln!(output, "| Scenario | Before | After | Change |")?;
    writeln!(output, "|----------|--------|-------|--------|")?;
    let status = |s: Option<ScenarioStatus>| s.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
    for change in &comparison.changes {
        writeln!(
            output,
            "| {} | {} | {} | {} {} |",
            change.scenario,
            status(change.baseline),
            status(change.current),
            change.kind.symbol(),
            change.kind
        )?;
    }
    if comparison.has_regressions() {
        writeln!(output, "\n**{} regression(s)**", comparison.regressions().len())?;
    }
    Ok(())
}

fn verdict(run: &StoredRun) -> &'static str {
    if run.is_successful() {
        "PASSED"
    } else {
        "FAILED"
    }
}

/// Report output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Markdown => "md",
        }
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
