//! Results storage and retrieval
//!
//! Each run is one JSON file under `<root>/<suite>/<run_id>.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::{ScenarioStatus, SuiteSummary};
use crate::output::results_csv;

/// Stored run containing every round
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRun {
    /// Unique run ID
    pub id: String,

    pub suite: String,

    /// Console the run was pointed at
    pub base_url: String,

    pub started_at: DateTime<Utc>,

    pub completed_at: DateTime<Utc>,

    pub rounds: u32,

    /// Whether unclear outcomes counted as failures
    #[serde(default)]
    pub strict: bool,

    pub summaries: Vec<SuiteSummary>,

    pub aggregate: Option<AggregateStats>,

    pub environment: EnvironmentInfo,
}

/// Aggregate statistics across all rounds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregateStats {
    pub avg_pass_rate: f64,
    pub min_pass_rate: f64,
    pub max_pass_rate: f64,
    pub avg_duration_ms: u64,
    pub total_duration_ms: u64,

    /// Keyed by scenario label
    pub scenario_stats: BTreeMap<String, StoredScenarioStats>,
}

/// Statistics for a single scenario across rounds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredScenarioStats {
    pub pass_count: u32,
    pub fail_count: u32,
    /// Pass rate, 0.0 - 100.0
    pub pass_rate: f64,
    pub avg_duration_ms: u64,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
}

/// Environment information
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub arch: String,
    pub browser: String,
    pub headless: bool,
    pub tool_version: String,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            browser: String::new(),
            headless: true,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl StoredRun {
    pub fn new(suite: &str, base_url: &str) -> Self {
        Self {
            id: generate_run_id(),
            suite: suite.to_string(),
            base_url: base_url.to_string(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            rounds: 0,
            strict: false,
            summaries: Vec::new(),
            aggregate: None,
            environment: EnvironmentInfo::default(),
        }
    }

    pub fn with_environment(mut self, environment: EnvironmentInfo) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn add_round(&mut self, summary: SuiteSummary) {
        self.rounds = self.rounds.max(summary.round);
        self.summaries.push(summary);
        self.completed_at = Utc::now();
    }

    /// Whether the run would exit successfully
    pub fn is_successful(&self) -> bool {
        self.summaries.iter().all(|s| s.is_successful(self.strict))
    }

    pub fn calculate_aggregate(&mut self) {
        if self.summaries.is_empty() {
            return;
        }

        let pass_rates: Vec<f64> = self.summaries.iter().map(|s| s.pass_rate()).collect();
        let total_duration_ms: u64 = self.summaries.iter().map(|s| s.total_duration_ms).sum();

        let mut by_scenario: BTreeMap<String, Vec<(ScenarioStatus, u64)>> = BTreeMap::new();
        for summary in &self.summaries {
            for result in &summary.results {
                by_scenario
                    .entry(result.label())
                    .or_default()
                    .push((result.status, result.duration_ms));
            }
        }

        let mut scenario_stats = BTreeMap::new();
        for (name, runs) in by_scenario {
            let executed: Vec<_> = runs.iter().filter(|(s, _)| *s != ScenarioStatus::Skip).collect();
            let pass_count = executed.iter().filter(|(s, _)| s.is_success()).count() as u32;
            let fail_count = executed.len() as u32 - pass_count;
            let pass_rate = if executed.is_empty() {
                0.0
            } else {
                pass_count as f64 / executed.len() as f64 * 100.0
            };
            let durations: Vec<u64> = executed.iter().map(|(_, d)| *d).collect();

            scenario_stats.insert(
                name,
                StoredScenarioStats {
                    pass_count,
                    fail_count,
                    pass_rate,
                    avg_duration_ms: durations.iter().sum::<u64>() / durations.len().max(1) as u64,
                    min_duration_ms: durations.iter().copied().min().unwrap_or(0),
                    max_duration_ms: durations.iter().copied().max().unwrap_or(0),
                },
            );
        }

        self.aggregate = Some(AggregateStats {
            avg_pass_rate: pass_rates.iter().sum::<f64>() / pass_rates.len() as f64,
            min_pass_rate: pass_rates.iter().copied().fold(f64::INFINITY, f64::min),
            max_pass_rate: pass_rates.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg_duration_ms: total_duration_ms / self.summaries.len() as u64,
            total_duration_ms,
            scenario_stats,
        });
    }
}

/// `<yyyymmdd_HHMMSS>_<4 random digits>`
fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Results storage manager
#[derive(Clone, Debug)]
pub struct ResultsStorage {
    base_dir: PathBuf,
}

impl ResultsStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn suite_dir(&self, suite: &str) -> PathBuf {
        self.base_dir.join(suite.to_lowercase())
    }

    fn run_path(&self, suite: &str, run_id: &str) -> PathBuf {
        self.suite_dir(suite).join(format!("{run_id}.json"))
    }

    pub fn save(&self, run: &StoredRun) -> Result<PathBuf> {
        let suite_dir = self.suite_dir(&run.suite);
        fs::create_dir_all(&suite_dir)
            .with_context(|| format!("Failed to create directory: {}", suite_dir.display()))?;

        let path = self.run_path(&run.suite, &run.id);
        let file = File::create(&path).context("Failed to create results file")?;
        serde_json::to_writer_pretty(BufWriter::new(file), run)
            .context("Failed to write results")?;

        info!("Saved results to {}", path.display());
        Ok(path)
    }

    pub fn load(&self, suite: &str, run_id: &str) -> Result<StoredRun> {
        let path = self.run_path(suite, run_id);
        let run = self.load_from_path(&path)?;
        debug!("Loaded results from {}", path.display());
        Ok(run)
    }

    pub fn load_from_path(&self, path: &Path) -> Result<StoredRun> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open results file: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file)).context("Failed to parse results")
    }

    /// Every readable run of a suite, newest first
    pub fn load_suite(&self, suite: &str) -> Result<Vec<StoredRun>> {
        let suite_dir = self.suite_dir(suite);
        if !suite_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&suite_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                match self.load_from_path(&path) {
                    Ok(run) => runs.push(run),
                    Err(e) => debug!("Failed to load {}: {:#}", path.display(), e),
                }
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| b.id.cmp(&a.id)));
        Ok(runs)
    }

    /// Suites that have stored runs
    pub fn list_suites(&self) -> Result<Vec<String>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut suites = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    suites.push(name.to_string());
                }
            }
        }

        suites.sort();
        Ok(suites)
    }

    pub fn list_runs(&self, suite: &str) -> Result<Vec<RunInfo>> {
        Ok(self
            .load_suite(suite)?
            .into_iter()
            .map(|run| RunInfo {
                pass_rate: run.aggregate.as_ref().map(|a| a.avg_pass_rate).unwrap_or(0.0),
                successful: run.is_successful(),
                id: run.id,
                suite: run.suite,
                started_at: run.started_at,
                rounds: run.rounds,
            })
            .collect())
    }

    pub fn latest(&self, suite: &str) -> Result<Option<StoredRun>> {
        Ok(self.load_suite(suite)?.into_iter().next())
    }

    pub fn delete(&self, suite: &str, run_id: &str) -> Result<bool> {
        let path = self.run_path(suite, run_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete {}", path.display()))?;
        info!("Deleted results: {}", path.display());
        Ok(true)
    }

    pub fn export(&self, run: &StoredRun, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                serde_json::to_writer_pretty(BufWriter::new(file), run)?;
            }
            ExportFormat::Csv => {
                fs::write(path, results_csv(&run.summaries)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }

        info!("Exported results to {}", path.display());
        Ok(())
    }
}

/// Brief run information
#[derive(Clone, Debug)]
pub struct RunInfo {
    pub id: String,
    pub suite: String,
    pub started_at: DateTime<Utc>,
    pub rounds: u32,
    pub pass_rate: f64,
    pub successful: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ScenarioResult;
    use chrono::Duration;
    use tempfile::tempdir;

    pub(crate) fn sample_run(statuses: &[(&str, ScenarioStatus)]) -> StoredRun {
        let results = statuses
            .iter()
            .map(|(name, status)| match status {
                ScenarioStatus::Pass => ScenarioResult::pass(*name, 100),
                ScenarioStatus::Fail => ScenarioResult::fail(*name, 100, "error shown"),
                ScenarioStatus::Unclear => ScenarioResult::unclear(*name, 100, "no indicator"),
                ScenarioStatus::Skip => ScenarioResult::skip(*name, "skipped"),
                ScenarioStatus::Error => ScenarioResult::error(*name, "browser closed"),
            })
            .collect();
        let mut run = StoredRun::new("smoke", "http://console.test");
        run.add_round(SuiteSummary::new(1, "smoke", results));
        run.calculate_aggregate();
        run
    }

    #[test]
    fn test_generate_run_id() {
        let id = generate_run_id();
        assert_eq!(id.len(), "20260101_120000_0000".len());
        assert_eq!(id.matches('_').count(), 2);
    }

    #[test]
    fn test_aggregate_skips_do_not_count() {
        let run = sample_run(&[
            ("Login", ScenarioStatus::Pass),
            ("Create Team", ScenarioStatus::Fail),
            ("Delete Team", ScenarioStatus::Skip),
        ]);
        let aggregate = run.aggregate.unwrap();
        assert!((aggregate.avg_pass_rate - 33.33).abs() < 0.01);
        assert_eq!(aggregate.scenario_stats["Login"].pass_rate, 100.0);
        assert_eq!(aggregate.scenario_stats["Delete Team"].pass_count, 0);
        assert_eq!(aggregate.scenario_stats["Delete Team"].fail_count, 0);
        assert_eq!(aggregate.total_duration_ms, 200);
    }

    #[test]
    fn test_strict_run_success() {
        let run = sample_run(&[("Login", ScenarioStatus::Pass), ("Vault", ScenarioStatus::Unclear)]);
        assert!(run.is_successful());
        assert!(!run.with_strict(true).is_successful());
    }

    #[test]
    fn test_save_list_latest_delete() {
        let dir = tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());

        let mut older = sample_run(&[("Login", ScenarioStatus::Fail)]);
        older.id = "20260101_000000_0001".to_string();
        older.started_at = Utc::now() - Duration::hours(1);
        let mut newer = sample_run(&[("Login", ScenarioStatus::Pass)]);
        newer.id = "20260101_010000_0002".to_string();

        storage.save(&older).unwrap();
        let path = storage.save(&newer).unwrap();
        assert_eq!(path, dir.path().join("smoke").join("20260101_010000_0002.json"));
        fs::write(dir.path().join("smoke/broken.json"), "{").unwrap();

        assert_eq!(storage.list_suites().unwrap(), vec!["smoke"]);
        let runs = storage.list_runs("smoke").unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, newer.id);
        assert!(runs[0].successful);
        assert!(!runs[1].successful);

        assert_eq!(storage.latest("smoke").unwrap().unwrap().id, newer.id);
        assert!(storage.delete("smoke", &newer.id).unwrap());
        assert!(!storage.delete("smoke", &newer.id).unwrap());
        assert_eq!(storage.latest("smoke").unwrap().unwrap().id, older.id);
        assert!(storage.latest("system").unwrap().is_none());
    }

    #[test]
    fn test_export() {
        let dir = tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());
        let run = sample_run(&[("Login", ScenarioStatus::Pass)]);

        let csv_path = dir.path().join("run.csv");
        storage.export(&run, &csv_path, ExportFormat::Csv).unwrap();
        let csv = fs::read_to_string(&csv_path).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("1,,Login,,PASS,100"));

        let json_path = dir.path().join("run.json");
        storage.export(&run, &json_path, ExportFormat::Json).unwrap();
        assert_eq!(storage.load_from_path(&json_path).unwrap().id, run.id);
    }

    #[test]
    fn test_export_format() {
        assert_eq!(ExportFormat::from_str("JSON"), Some(ExportFormat::Json));
        assert_eq!(
            ExportFormat::from_extension(Path::new("out/results.csv")),
            Some(ExportFormat::Csv)
        );
        assert!(ExportFormat::from_str("xml").is_none());
    }
}
