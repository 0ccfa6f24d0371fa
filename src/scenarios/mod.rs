//! Scenarios
//!
//! A scenario is a named, linear list of [`Step`]s. The built-in catalog
//! covers the console workflows; config files can add more or replace
//! built-ins by name.

mod catalog;
mod engine;
mod steps;

pub use catalog::ScenarioCase;
pub use engine::run_scenario;
pub use steps::Step;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_category() -> String {
    "Custom".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u16>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

/// `Create Repository` -> `create_repository`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

impl ScenarioDefinition {
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// Built-in and configured scenarios, addressable by name, slug or number
#[derive(Clone, Debug)]
pub struct ScenarioRegistry {
    scenarios: Vec<ScenarioDefinition>,
}

impl ScenarioRegistry {
    /// Built-ins overlaid with `custom`; a custom scenario whose name matches
    /// a built-in replaces it and inherits its number
    pub fn new(custom: &[ScenarioDefinition]) -> Self {
        let mut scenarios: Vec<ScenarioDefinition> = ScenarioCase::all()
            .iter()
            .map(ScenarioCase::definition)
            .collect();

        for definition in custom {
            let slug = definition.slug();
            match scenarios.iter_mut().find(|s| s.slug() == slug) {
                Some(existing) => {
                    let number = definition.number.or(existing.number);
                    *existing = ScenarioDefinition {
                        number,
                        ..definition.clone()
                    };
                }
                None => scenarios.push(definition.clone()),
            }
        }

        Self { scenarios }
    }

    /// Look up by catalog number, slug or display name
    pub fn resolve(&self, key: &str) -> Option<&ScenarioDefinition> {
        let key = key.trim();
        if let Ok(number) = key.parse::<u16>() {
            return self.scenarios.iter().find(|s| s.number == Some(number));
        }
        let slug = slugify(key);
        self.scenarios.iter().find(|s| s.slug() == slug)
    }

    pub fn all(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Create Repository"), "create_repository");
        assert_eq!(slugify("  Reset Bridge-Auth "), "reset_bridge_auth");
        assert_eq!(slugify("open_audit"), "open_audit");
    }

    #[test]
    fn test_resolve_by_number_slug_and_name() {
        let registry = ScenarioRegistry::new(&[]);
        assert_eq!(registry.all().len(), 33);
        assert_eq!(registry.resolve("6").unwrap().name, "Create Repository");
        assert_eq!(registry.resolve("delete_region").unwrap().number, Some(33));
        assert_eq!(registry.resolve("Edit Bridge").unwrap().number, Some(28));
        assert_eq!(registry.resolve("storage_import").unwrap().number, Some(11));
        assert!(registry.resolve("99").is_none());
        assert!(registry.resolve("nope").is_none());
    }

    #[test]
    fn test_custom_scenarios() {
        let replacement = ScenarioDefinition {
            name: "Create Team".to_string(),
            number: None,
            category: "System".to_string(),
            description: "Team via a different form".to_string(),
            steps: vec![Step::navigate("/console/organization/teams")],
        };
        let extra: ScenarioDefinition =
            serde_yaml::from_str("name: open_audit\nsteps:\n  - action: navigate\n    path: /console/audit\n")
                .unwrap();
        assert_eq!(extra.category, "Custom");

        let registry = ScenarioRegistry::new(&[replacement, extra]);
        assert_eq!(registry.all().len(), 34);

        let team = registry.resolve("create_team").unwrap();
        assert_eq!(team.number, Some(19));
        assert_eq!(team.steps.len(), 1);
        assert_eq!(registry.resolve("19").unwrap().description, "Team via a different form");
        assert!(registry.resolve("open_audit").unwrap().number.is_none());
    }
}
