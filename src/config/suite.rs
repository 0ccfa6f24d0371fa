//! Suite definitions
//!
//! A suite is a named, ordered list of scenarios run in one browser session.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scenarios::ScenarioCase;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuiteDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Scenario names, slugs or catalog numbers
    pub scenarios: Vec<String>,

    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Skip the rest of a round after the first failure
    #[serde(default)]
    pub stop_on_failure: bool,
}

fn default_rounds() -> u32 {
    1
}

impl SuiteDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            scenarios: Vec::new(),
            rounds: 1,
            stop_on_failure: false,
        }
    }

    pub fn with_scenarios<I, S>(mut self, scenarios: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scenarios = scenarios.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cases(self, cases: &[ScenarioCase]) -> Self {
        self.with_scenarios(cases.iter().map(|c| c.slug()))
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn stop_on_failure(mut self) -> Self {
        self.stop_on_failure = true;
        self
    }

    /// Ad-hoc suite for `run --scenario ...`
    pub fn adhoc(scenarios: &[String]) -> Self {
        Self::new("adhoc", "Scenarios selected on the command line")
            .with_scenarios(scenarios.iter().cloned())
    }

    pub fn smoke() -> Self {
        Self::new("smoke", "Login and a repository round trip").with_cases(&[
            ScenarioCase::Login,
            ScenarioCase::CreateRepository,
            ScenarioCase::DeleteRepository,
        ])
    }

    pub fn full_suite() -> Self {
        Self::new(
            "full_suite",
            "Registration, login and the repository lifecycle",
        )
        .with_cases(&[
            ScenarioCase::Register,
            ScenarioCase::Login,
            ScenarioCase::CreateRepository,
            ScenarioCase::EditRepository,
            ScenarioCase::RepositoryDown,
            ScenarioCase::RepositoryPush,
        ])
    }

    fn category(name: &str, description: &str, category: &str) -> Self {
        let cases: Vec<ScenarioCase> = ScenarioCase::all()
            .into_iter()
            .filter(|c| c.category() == category)
            .collect();
        let mut suite = Self::new(name, description).with_cases(&cases);
        if !cases.contains(&ScenarioCase::Login) {
            suite.scenarios.insert(0, ScenarioCase::Login.slug().to_string());
        }
        suite
    }

    pub fn all() -> Self {
        Self::new("all", "Every built-in scenario in catalog order")
            .with_cases(&ScenarioCase::all())
    }

    /// Suites available without a config file
    pub fn predefined() -> Vec<SuiteDefinition> {
        vec![
            Self::smoke(),
            Self::full_suite(),
            Self::category("resources", "Machines and repositories", "Resources"),
            Self::category("containers", "Container actions on a running repository", "Containers"),
            Self::category("system", "Users, teams, permissions, bridges and regions", "System"),
            Self::all(),
        ]
    }

    /// Config suites first, then predefined ones
    pub fn find(name: &str, configured: &[SuiteDefinition]) -> Option<SuiteDefinition> {
        configured
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .or_else(|| Self::predefined().into_iter().find(|s| s.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_suite_order() {
        let suite = SuiteDefinition::full_suite();
        assert_eq!(
            suite.scenarios,
            vec![
                "register",
                "login",
                "create_repository",
                "edit_repository",
                "repository_down",
                "repository_push"
            ]
        );
        assert_eq!(suite.rounds, 1);
    }

    #[test]
    fn test_category_suites_start_with_login() {
        let system = SuiteDefinition::find("system", &[]).unwrap();
        assert_eq!(system.scenarios[0], "login");
        assert_eq!(system.scenarios.len(), 17);
        assert!(system.scenarios.contains(&"reset_bridge_auth".to_string()));
    }

    #[test]
    fn test_configured_suite_wins() {
        let custom = SuiteDefinition::new("smoke", "mine")
            .with_scenarios(["login"])
            .with_rounds(3)
            .stop_on_failure();
        let found = SuiteDefinition::find("smoke", &[custom]).unwrap();
        assert_eq!(found.description, "mine");
        assert_eq!(found.rounds, 3);
        assert!(found.stop_on_failure);
        assert!(SuiteDefinition::find("nope", &[]).is_none());
    }

    #[test]
    fn test_yaml_defaults() {
        let suite: SuiteDefinition =
            serde_yaml::from_str("name: nightly\nscenarios: [\"2\", create_user]\n").unwrap();
        assert_eq!(suite.rounds, 1);
        assert!(!suite.stop_on_failure);
        assert_eq!(suite.scenarios, vec!["2", "create_user"]);
    }
}
