//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Browser-driven end-to-end scenarios for the Rediacc web console
#[derive(Parser, Debug)]
#[command(name = "console-e2e")]
#[command(version)]
#[command(about = "Run end-to-end scenarios against the web console")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a suite or individual scenarios
    Run(RunArgs),

    /// List available scenarios and suites
    List(ListArgs),

    /// View stored results
    Results(ResultsArgs),

    /// Run pre-flight checks
    Check,

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite to run (predefined or from the config file)
    #[arg(short, long)]
    pub suite: Option<String>,

    /// Scenario number, slug or name; repeat to run several
    #[arg(short = 'n', long = "scenario")]
    pub scenarios: Vec<String>,

    /// Number of rounds (overrides the suite)
    #[arg(short, long)]
    pub rounds: Option<u32>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Run the browser headless
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// WebDriver endpoint
    #[arg(long)]
    pub webdriver: Option<String>,

    /// Treat unclear outcomes as failures; a Register that did not complete
    /// stays a warning
    #[arg(long)]
    pub strict: bool,

    /// Save results to file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not store the run in the results history
    #[arg(long)]
    pub no_save: bool,
}

impl RunArgs {
    /// Headless override from `--headless` / `--headed`
    pub fn headless_override(&self) -> Option<bool> {
        if self.headless {
            Some(true)
        } else if self.headed {
            Some(false)
        } else {
            None
        }
    }
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show scenario descriptions and steps
    #[arg(short, long)]
    pub detailed: bool,

    /// Show suites instead of scenarios
    #[arg(short, long)]
    pub suites: bool,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Suite to show; lists stored suites when omitted
    #[arg(short, long)]
    pub suite: Option<String>,

    /// List runs instead of the latest report
    #[arg(long)]
    pub summary: bool,

    /// Report format (text, markdown, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Export the latest run (.json or .csv)
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Compare the two latest runs
    #[arg(long)]
    pub compare: bool,

    /// Delete a stored run of the suite
    #[arg(long, value_name = "RUN_ID")]
    pub delete: Option<String>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Destination
        #[arg(default_value = "console-e2e.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration with secrets masked
    Show,

    /// Validate the configuration
    Validate,

    /// Print the JSON Schema of the configuration file
    Schema,

    /// Show environment variable overrides
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_args() {
        let args = Args::parse_from(["console-e2e", "list", "--detailed"]);
        match args.command {
            Command::List(list_args) => {
                assert!(list_args.detailed);
                assert!(!list_args.suites);
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "console-e2e",
            "--config",
            "ci.yaml",
            "run",
            "--suite",
            "smoke",
            "--scenario",
            "3",
            "-n",
            "create_team",
            "--rounds",
            "5",
            "--headed",
            "--strict",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("ci.yaml")));
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.suite.as_deref(), Some("smoke"));
                assert_eq!(run.scenarios, vec!["3", "create_team"]);
                assert_eq!(run.rounds, Some(5));
                assert_eq!(run.headless_override(), Some(false));
                assert!(run.strict);
                assert!(!run.no_save);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_headless_flags_conflict() {
        assert!(Args::try_parse_from(["console-e2e", "run", "--headless", "--headed"]).is_err());
        let args = Args::parse_from(["console-e2e", "run"]);
        match args.command {
            Command::Run(run) => assert_eq!(run.headless_override(), None),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_config_actions() {
        let args = Args::parse_from(["console-e2e", "config", "init", "--force"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { path, force },
            }) => {
                assert_eq!(path, PathBuf::from("console-e2e.yaml"));
                assert!(force);
            }
            _ => panic!("Expected config init"),
        }
        assert!(matches!(
            Args::parse_from(["console-e2e", "check", "-v"]).command,
            Command::Check
        ));
    }
}
