//! Cross-round statistics

use std::collections::BTreeMap;
use std::fmt;

use crate::models::{ScenarioStatus, SuiteSummary};

/// Statistics for a single scenario across rounds
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenarioStats {
    pub passes: u32,
    pub failures: u32,
    pub unclear: u32,
    pub skips: u32,
    pub errors: u32,
    pub total_duration_ms: u64,
}

impl ScenarioStats {
    /// Rounds in which the scenario actually ran
    pub fn executed(&self) -> u32 {
        self.passes + self.failures + self.unclear + self.errors
    }

    pub fn avg_duration_ms(&self) -> u64 {
        match self.executed() {
            0 => 0,
            n => self.total_duration_ms / u64::from(n),
        }
    }

    pub fn pass_rate(&self) -> f64 {
        match self.executed() {
            0 => 0.0,
            n => (self.passes as f64 / n as f64) * 100.0,
        }
    }
}

/// Aggregate results across rounds of one suite
#[derive(Clone, Debug)]
pub struct AggregateResult {
    pub total_rounds: u32,
    pub scenario_stats: BTreeMap<String, ScenarioStats>,
    pub overall_pass_rate: f64,
}

impl AggregateResult {
    pub fn from_summaries(summaries: &[SuiteSummary]) -> Self {
        let mut scenario_stats: BTreeMap<String, ScenarioStats> = BTreeMap::new();

        for summary in summaries {
            for result in &summary.results {
                let stats = scenario_stats.entry(result.label()).or_default();
                match result.status {
                    ScenarioStatus::Pass => stats.passes += 1,
                    ScenarioStatus::Fail => stats.failures += 1,
                    ScenarioStatus::Unclear => stats.unclear += 1,
                    ScenarioStatus::Skip => stats.skips += 1,
                    ScenarioStatus::Error => stats.errors += 1,
                }
                stats.total_duration_ms += result.duration_ms;
            }
        }

        let overall_pass_rate = if summaries.is_empty() {
            0.0
        } else {
            summaries.iter().map(|s| s.pass_rate()).sum::<f64>() / summaries.len() as f64
        };

        Self {
            total_rounds: summaries.len() as u32,
            scenario_stats,
            overall_pass_rate,
        }
    }

    /// Scenarios that passed in some rounds but not all, lowest rate first
    pub fn flaky_scenarios(&self) -> Vec<(&str, f64)> {
        let mut flaky: Vec<_> = self
            .scenario_stats
            .iter()
            .filter(|(_, stats)| stats.passes > 0 && stats.passes < stats.executed())
            .map(|(name, stats)| (name.as_str(), stats.pass_rate()))
            .collect();
        flaky.sort_by(|a, b| a.1.total_cmp(&b.1));
        flaky
    }

    pub fn stable_scenarios(&self) -> Vec<&str> {
        self.scenario_stats
            .iter()
            .filter(|(_, stats)| stats.executed() > 0 && stats.passes == stats.executed())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Aggregate over {} round(s)", self.total_rounds)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for (name, stats) in &self.scenario_stats {
            writeln!(
                f,
                "  {:<32} {:>5.1}%  avg {}ms",
                name,
                stats.pass_rate(),
                stats.avg_duration_ms()
            )?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        let flaky = self.flaky_scenarios();
        if !flaky.is_empty() {
            writeln!(f, "Flaky:")?;
            for (name, rate) in flaky {
                writeln!(f, "  {name} ({rate:.1}%)")?;
            }
        }
        writeln!(f, "Overall Pass Rate: {:.1}%", self.overall_pass_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScenarioResult;

    #[test]
    fn test_aggregate_results() {
        let round1 = vec![
            ScenarioResult::pass("Login", 100).with_number(Some(2)),
            ScenarioResult::fail("Create Team", 50, "already exists").with_number(Some(19)),
            ScenarioResult::skip("Delete Team", "no suitable target"),
        ];
        let round2 = vec![
            ScenarioResult::pass("Login", 120).with_number(Some(2)),
            ScenarioResult::pass("Create Team", 60).with_number(Some(19)),
            ScenarioResult::skip("Delete Team", "no suitable target"),
        ];

        let aggregate = AggregateResult::from_summaries(&[
            SuiteSummary::new(1, "system", round1),
            SuiteSummary::new(2, "system", round2),
        ]);

        assert_eq!(aggregate.total_rounds, 2);
        assert_eq!(aggregate.scenario_stats["#2 Login"].pass_rate(), 100.0);
        assert_eq!(aggregate.scenario_stats["#2 Login"].avg_duration_ms(), 110);
        assert_eq!(aggregate.flaky_scenarios(), vec![("#19 Create Team", 50.0)]);
        assert_eq!(aggregate.stable_scenarios(), vec!["#2 Login"]);
        assert_eq!(aggregate.scenario_stats["Delete Team"].skips, 2);
        assert!(aggregate.to_string().contains("Flaky:"));
    }

    #[test]
    fn test_aggregate_empty() {
        let aggregate = AggregateResult::from_summaries(&[]);
        assert_eq!(aggregate.overall_pass_rate, 0.0);
        assert!(aggregate.flaky_scenarios().is_empty());
    }
}
