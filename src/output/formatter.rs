//! Output formatters for scenario results
//!
//! Table, JSON, CSV and one-line summary renderings of a round.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::executor::AggregateResult;
use crate::models::{ScenarioResult, ScenarioStatus, SuiteSummary};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// One CSV row per scenario
#[derive(Serialize)]
struct CsvRow<'a> {
    round: u32,
    number: String,
    scenario: &'a str,
    category: &'a str,
    status: String,
    duration_ms: u64,
    message: &'a str,
}

impl<'a> CsvRow<'a> {
    fn new(round: u32, result: &'a ScenarioResult) -> Self {
        Self {
            round,
            number: result.number.map(|n| n.to_string()).unwrap_or_default(),
            scenario: &result.scenario,
            category: &result.category,
            status: result.status.to_string(),
            duration_ms: result.duration_ms,
            message: result.message.as_deref().unwrap_or(""),
        }
    }
}

/// CSV for the results of several rounds, header included
pub fn results_csv(summaries: &[SuiteSummary]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for summary in summaries {
        for result in &summary.results {
            writer
                .serialize(CsvRow::new(summary.round, result))
                .context("Failed to write CSV row")?;
        }
    }
    let bytes = writer.into_inner().context("Failed to flush CSV")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn paint(&self, text: &str, status: ScenarioStatus) -> String {
        if !self.colorize {
            return text.to_string();
        }
        let code = match status {
            ScenarioStatus::Pass => "32",
            ScenarioStatus::Fail | ScenarioStatus::Error => "31",
            ScenarioStatus::Unclear | ScenarioStatus::Skip => "33",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn json<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_default()
    }

    fn format_result_table(&self, result: &ScenarioResult) -> String {
        let status = format!("{} {:<7}", result.status.symbol(), result.status);
        let number = result.number.map(|n| format!("{n:2}.")).unwrap_or_else(|| "   ".to_string());
        let mut line = format!(
            "{} {:28} {} [{:>7}ms]",
            number,
            result.scenario,
            self.paint(&status, result.status),
            result.duration_ms
        );
        if let Some(message) = result.message.as_deref().filter(|_| !result.status.is_success()) {
            let short: String = message.chars().take(60).collect();
            line.push_str(&format!("  {short}"));
        }
        line
    }

    /// Format a round summary
    pub fn format_summary(&self, summary: &SuiteSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(summary),
            OutputFormat::Csv => results_csv(std::slice::from_ref(summary)).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    /// Format every round; CSV gets a single header
    pub fn format_summaries(&self, summaries: &[SuiteSummary]) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(&summaries),
            OutputFormat::Csv => results_csv(summaries).unwrap_or_default(),
            _ => summaries
                .iter()
                .map(|s| self.format_summary(s))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn format_summary_table(&self, summary: &SuiteSummary) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  Round {:3} - {:47} ║\n",
            summary.round, summary.suite
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        for result in &summary.results {
            output.push_str(&format!("  {}\n", self.format_result_table(result)));
        }

        output.push_str("──────────────────────────────────────────────────────────────────\n");

        let passed = self.paint(&summary.passed.to_string(), ScenarioStatus::Pass);
        let failed = if summary.failed > 0 {
            self.paint(&summary.failed.to_string(), ScenarioStatus::Fail)
        } else {
            summary.failed.to_string()
        };
        output.push_str(&format!(
            "  Total: {} | Pass: {} | Fail: {} | Unclear: {} | Skip: {} | Error: {}\n",
            summary.total, passed, failed, summary.unclear, summary.skipped, summary.errors
        ));
        output.push_str(&format!(
            "  Pass Rate: {:5.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));

        output
    }

    fn format_summary_brief(&self, summary: &SuiteSummary) -> String {
        format!(
            "{} - Round {}: {}/{} passed, {} unclear, {} failed, {} error(s) ({:.1}%) in {}ms",
            summary.suite,
            summary.round,
            summary.passed,
            summary.total,
            summary.unclear,
            summary.failed,
            summary.errors,
            summary.pass_rate(),
            summary.total_duration_ms
        )
    }

    /// Format aggregate results
    pub fn format_aggregate(&self, aggregate: &AggregateResult, suite: &str) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                #[derive(Serialize)]
                #[serde(rename_all = "camelCase")]
                struct AggregateJson<'a> {
                    suite: &'a str,
                    total_rounds: u32,
                    overall_pass_rate: f64,
                    pass_rates: Vec<(&'a str, f64)>,
                    flaky: Vec<(&'a str, f64)>,
                }

                self.json(&AggregateJson {
                    suite,
                    total_rounds: aggregate.total_rounds,
                    overall_pass_rate: aggregate.overall_pass_rate,
                    pass_rates: aggregate
                        .scenario_stats
                        .iter()
                        .map(|(name, stats)| (name.as_str(), stats.pass_rate()))
                        .collect(),
                    flaky: aggregate.flaky_scenarios(),
                })
            }
            _ => self.format_aggregate_table(aggregate, suite),
        }
    }

    fn format_aggregate_table(&self, aggregate: &AggregateResult, suite: &str) -> String {
        let mut output = String::new();

        output.push_str("\n═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Aggregate Results: {} ({} rounds)\n",
            suite, aggregate.total_rounds
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Overall Pass Rate: {:.1}%\n\n",
            aggregate.overall_pass_rate
        ));

        output.push_str(" Scenario Pass Rates:\n");
        output.push_str(" ───────────────────────────────────────────────────────────\n");

        for (name, stats) in &aggregate.scenario_stats {
            let rate = stats.pass_rate();
            let bar_len = ((rate / 5.0) as usize).min(20);
            let bar = "█".repeat(bar_len);
            let empty = "░".repeat(20 - bar_len);
            let status = if rate >= 90.0 {
                ScenarioStatus::Pass
            } else if rate >= 50.0 {
                ScenarioStatus::Unclear
            } else {
                ScenarioStatus::Fail
            };
            output.push_str(&format!(
                " {:32} {}{} {}\n",
                name,
                bar,
                empty,
                self.paint(&format!("{rate:5.1}%"), status)
            ));
        }

        output.push_str(" ───────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            " Stable: {}/{} scenarios passed every round\n",
            aggregate.stable_scenarios().len(),
            aggregate.scenario_stats.len()
        ));

        let flaky = aggregate.flaky_scenarios();
        if !flaky.is_empty() {
            output.push_str("\n Flaky Scenarios (< 100% pass rate):\n");
            for (name, rate) in flaky.iter().take(5) {
                output.push_str(&format!("   - {name} ({rate:.1}%)\n"));
            }
        }

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write rounds to a file without colours
pub fn write_results_to_file(
    path: &Path,
    summaries: &[SuiteSummary],
    format: OutputFormat,
) -> Result<()> {
    let content = ResultFormatter::new(format).no_color().format_summaries(summaries);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write results: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SuiteSummary {
        SuiteSummary::new(
            1,
            "smoke",
            vec![
                ScenarioResult::pass("Login", 1200).with_number(Some(2)),
                ScenarioResult::fail("Create Repository", 900, "error shown: \"already exists\"")
                    .with_number(Some(6)),
            ],
        )
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("json-pretty"), Some(OutputFormat::JsonPretty));
        assert_eq!(OutputFormat::from_str("unknown"), None);
    }

    #[test]
    fn test_table_without_color() {
        let output = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_summary(&summary());
        assert!(output.contains(" 2. Login"));
        assert!(output.contains("✗ FAIL"));
        assert!(output.contains("Pass Rate:  50.0%"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_csv_quotes_messages() {
        let csv = results_csv(&[summary()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("round,number,scenario,category,status,duration_ms,message")
        );
        assert_eq!(lines.next(), Some("1,2,Login,,PASS,1200,"));
        assert!(lines.next().unwrap().ends_with("\"error shown: \"\"already exists\"\"\""));
    }

    #[test]
    fn test_json_and_summary() {
        let json = ResultFormatter::new(OutputFormat::Json).format_summary(&summary());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"][1]["status"], "fail");

        let brief = ResultFormatter::new(OutputFormat::Summary).format_summary(&summary());
        assert!(brief.starts_with("smoke - Round 1: 1/2 passed"));
    }

    #[test]
    fn test_write_results_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/results.csv");
        write_results_to_file(&path, &[summary(), summary()], OutputFormat::Csv).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 5);
    }
}
