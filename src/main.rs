//! console-e2e - Browser-driven end-to-end scenarios for the Rediacc console
//!
//! Drives a real browser through WebDriver, logs in once per round and runs
//! the selected scenarios in order on the same page.
//!
//! ## Features
//!
//! - 33 built-in scenarios plus custom ones from the config file
//! - Selector fallback cascades, success detection and queue trace polling
//! - Multiple rounds with flaky scenario detection
//! - Multiple output formats (Table, JSON, CSV, Summary)
//! - Stored run history with comparison and Markdown reports
//!
//! ## Usage
//!
//! ```bash
//! # Run the smoke suite
//! console-e2e run --suite smoke
//!
//! # Run individual scenarios in a visible browser
//! console-e2e run --scenario 6 --scenario create_team --headed
//!
//! # Run ten rounds, failing on unclear outcomes
//! console-e2e run --suite full_suite --rounds 10 --strict
//!
//! # Check the console and WebDriver before a run
//! console-e2e check
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

mod browser;
mod cli;
mod config;
mod executor;
mod interact;
mod logging;
mod models;
mod output;
mod preflight;
mod results;
mod scenarios;
mod session;
mod utils;

use browser::{PageFactory, WebDriverFactory};
use cli::Args;
use config::{print_env_help, AppConfig, ConfigFile, EnvConfig, LogLevel, SuiteDefinition};
use executor::{AggregateResult, SuiteRunner};
use output::{write_results_to_file, OutputFormat, ResultFormatter};
use results::{EnvironmentInfo, ResultsStorage, StoredRun};
use scenarios::ScenarioRegistry;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let (file, source) = ConfigFile::load_or_default(args.config.as_deref(), env.config_file.as_deref())?;
    let mut config = file.app.clone();
    env.apply(&mut config);

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.logging.level
    };

    // Only commands that drive the console get a log session on disk
    let mut log_settings = config.logging.clone();
    if !matches!(args.command, cli::Command::Run(_) | cli::Command::Check) {
        log_settings.enabled = false;
    }
    let _logging = logging::init(&log_settings, level, "console_e2e", &config.sanitized())?;

    if let Some(path) = &source {
        info!("Loaded configuration from {}", path.display());
    }

    match args.command {
        cli::Command::Run(run_args) => run_suite(run_args, &file, config, &env).await,
        cli::Command::List(list_args) => {
            list_scenarios(list_args, &file);
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Results(results_args) => {
            show_results(results_args, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Check => run_preflight(&config).await,
        cli::Command::Config(config_args) => {
            manage_config(config_args, &file, &config, source.as_deref(), &env)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_suite(
    args: cli::RunArgs,
    file: &ConfigFile,
    mut config: AppConfig,
    env: &EnvConfig,
) -> Result<ExitCode> {
    if let Some(headless) = args.headless_override() {
        config.browser.headless = headless;
    }
    if let Some(url) = &args.webdriver {
        config.webdriver_url = url.clone();
    }
    config.validate()?;

    let suite = if args.scenarios.is_empty() {
        let name = args.suite.clone().unwrap_or_else(|| env.suite_or("smoke"));
        SuiteDefinition::find(&name, &file.suites)
            .ok_or_else(|| anyhow::anyhow!("Unknown suite: {name}"))?
    } else {
        SuiteDefinition::adhoc(&args.scenarios)
    };
    let rounds = args.rounds.unwrap_or(suite.rounds).max(1);

    let format_name = args.format.clone().unwrap_or_else(|| env.format_or("table"));
    let format = OutputFormat::from_str(&format_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {format_name}"))?;
    let mut formatter = ResultFormatter::new(format);
    if !config.logging.console_settings.colorize {
        formatter = formatter.no_color();
    }

    info!(
        "Running suite '{}' against {} ({} round(s), {})",
        suite.name,
        config.base_url,
        rounds,
        if config.browser.headless { "headless" } else { "headed" }
    );

    let config = Arc::new(config);
    let factory: Arc<dyn PageFactory> = Arc::new(WebDriverFactory::new(&config));
    let runner = SuiteRunner::new(
        Arc::clone(&config),
        factory,
        ScenarioRegistry::new(&file.scenarios),
    );

    let summaries = runner.run_rounds(&suite, rounds).await?;
    if summaries.iter().all(|s| s.is_all_passed()) {
        info!("All scenarios passed in every round");
    }

    println!("{}", formatter.format_summaries(&summaries));
    if summaries.len() > 1 {
        let aggregate = AggregateResult::from_summaries(&summaries);
        println!("{}", formatter.format_aggregate(&aggregate, &suite.name));
    }

    if let Some(path) = &args.output {
        write_results_to_file(path, &summaries, format)?;
        println!("✓ Results written to {}", path.display());
    }

    let mut run = StoredRun::new(&suite.name, &config.base_url)
        .with_environment(EnvironmentInfo {
            browser: config.browser.browser.to_string(),
            headless: config.browser.headless,
            ..EnvironmentInfo::default()
        })
        .with_strict(args.strict);
    for summary in summaries {
        run.add_round(summary);
    }
    run.calculate_aggregate();

    if !args.no_save {
        let storage = ResultsStorage::new(config.artifacts.results_dir());
        match storage.save(&run) {
            Ok(path) => info!("Run {} stored at {}", run.id, path.display()),
            Err(e) => warn!("Could not store run {}: {e:#}", run.id),
        }
    }

    if run.is_successful() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn list_scenarios(args: cli::ListArgs, file: &ConfigFile) {
    if args.suites {
        println!("\nSuites\n");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        let mut suites = SuiteDefinition::predefined();
        for configured in &file.suites {
            suites.retain(|s| s.name != configured.name);
            suites.push(configured.clone());
        }
        for suite in suites {
            println!("  {:14} {}", suite.name, suite.description);
            if args.detailed {
                println!("      scenarios: {}", suite.scenarios.join(", "));
                println!(
                    "      rounds: {}, stop on failure: {}",
                    suite.rounds, suite.stop_on_failure
                );
            }
        }
        println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        return;
    }

    let registry = ScenarioRegistry::new(&file.scenarios);
    println!("\nConsole Scenarios ({} total)\n", registry.all().len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut current_category = "";

    for scenario in registry.all() {
        if scenario.category != current_category {
            println!("\n{}:", scenario.category);
            println!("──────────────────────────────────────────────────────────────────────");
            current_category = scenario.category.as_str();
        }

        let number = scenario
            .number
            .map(|n| format!("{n:2}."))
            .unwrap_or_else(|| "  -".to_string());
        if args.detailed {
            println!("  {} {:28} ({})", number, scenario.name, scenario.slug());
            if !scenario.description.is_empty() {
                println!("      {}", scenario.description);
            }
            for (i, step) in scenario.steps.iter().enumerate() {
                println!("      {:2}. {}", i + 1, step.describe());
            }
        } else {
            println!("  {} {}", number, scenario.name);
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}

fn show_results(args: cli::ResultsArgs, config: &AppConfig) -> Result<()> {
    use results::{ComparisonFormatter, ExportFormat, RunComparator, ReportFormat, ReportGenerator};

    let storage = ResultsStorage::new(config.artifacts.results_dir());

    let Some(suite) = &args.suite else {
        let suites = storage.list_suites()?;
        if suites.is_empty() {
            println!("\n📭 No stored results in {}.", storage.base_dir().display());
            println!("   Run scenarios with: console-e2e run --suite <name>");
            return Ok(());
        }

        println!("\n┌─────────────────────────────────────────────────────────────┐");
        println!("│ Stored Results                                              │");
        println!("├─────────────────────────────────────────────────────────────┤");
        for suite in &suites {
            let runs = storage.list_runs(suite)?;
            if let Some(latest) = runs.first() {
                println!(
                    "│ {:25} │ {:3} runs │ Latest: {:5.1}% {} │",
                    suite,
                    runs.len(),
                    latest.pass_rate,
                    if latest.successful { "✓" } else { "✗" }
                );
            }
        }
        println!("└─────────────────────────────────────────────────────────────┘");
        println!("\nUse --suite <name> to view the latest run of a suite.\n");
        return Ok(());
    };

    if let Some(run_id) = &args.delete {
        if storage.delete(suite, run_id)? {
            println!("✓ Deleted run {run_id} of '{suite}'");
        } else {
            println!("No run {run_id} stored for suite '{suite}'");
        }
        return Ok(());
    }

    let generator = ReportGenerator::new(storage.clone());

    if args.summary {
        let runs = storage.list_runs(suite)?;
        if runs.is_empty() {
            println!("No results found for suite: {suite}");
            return Ok(());
        }
        println!("\nRuns of '{suite}' ({}):", runs.len());
        for run in runs {
            println!(
                "  {} {} | {} | {} round(s) | {:.1}%",
                if run.successful { "✓" } else { "✗" },
                run.id,
                run.started_at.format("%Y-%m-%d %H:%M:%S"),
                run.rounds,
                run.pass_rate
            );
        }
    } else if args.format == "json" {
        let runs = storage.load_suite(suite)?;
        if args.compare {
            let [current, baseline, ..] = runs.as_slice() else {
                anyhow::bail!("Suite '{suite}' needs at least two stored runs to compare");
            };
            println!(
                "{}",
                ComparisonFormatter::format_json(&RunComparator::compare(baseline, current))
            );
        } else {
            let latest = runs
                .first()
                .with_context(|| format!("No stored runs for suite '{suite}'"))?;
            println!("{}", serde_json::to_string_pretty(latest)?);
        }
    } else {
        let format = ReportFormat::from_str(&args.format)
            .ok_or_else(|| anyhow::anyhow!("Unknown report format: {}", args.format))?;
        if args.compare {
            println!("{}", generator.latest_comparison(suite, format)?);
        } else {
            println!("{}", generator.latest_report(suite, format)?);
        }
    }

    if let Some(path) = &args.export {
        let run = storage
            .latest(suite)?
            .with_context(|| format!("No stored runs for suite '{suite}'"))?;
        match ExportFormat::from_extension(path) {
            Some(export) => storage.export(&run, path, export)?,
            None => {
                let report = ReportFormat::from_str(
                    path.extension().and_then(|e| e.to_str()).unwrap_or("md"),
                )
                .unwrap_or(ReportFormat::Markdown);
                std::fs::write(path, generator.run_report(&run, report))
                    .with_context(|| format!("Failed to write report: {}", path.display()))?;
            }
        }
        println!("\n✓ Exported to: {}", path.display());
    }

    Ok(())
}

async fn run_preflight(config: &AppConfig) -> Result<ExitCode> {
    let checker = preflight::PreFlightChecker::new(config)?;
    let result = checker.run().await;
    println!("{}", result.format_table());

    if result.passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn manage_config(
    args: cli::ConfigArgs,
    file: &ConfigFile,
    config: &AppConfig,
    source: Option<&Path>,
    env: &EnvConfig,
) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    path.display()
                );
            }

            ConfigFile::example().save(&path)?;
            println!("✓ Configuration file created: {}", path.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show => {
            match source {
                Some(path) => println!("# Source: {}", path.display()),
                None => println!("# Source: built-in defaults"),
            }
            println!("{}", serde_yaml::to_string(&config.sanitized())?);
        }

        cli::ConfigAction::Validate => {
            let Some(path) = source else {
                println!("No configuration file found; built-in defaults are in use.");
                return Ok(());
            };

            match file.validate().and_then(|_| config.validate()) {
                Ok(()) => println!("✓ Configuration file is valid: {}", path.display()),
                Err(e) => {
                    println!("✗ Configuration file is invalid: {}", path.display());
                    println!("  Error: {e}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Schema => {
            let schema = schemars::schema_for!(ConfigFile);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }

        cli::ConfigAction::Env => {
            if env.has_any() {
                env.print_summary();
            } else {
                print_env_help();
            }
        }
    }

    Ok(())
}
