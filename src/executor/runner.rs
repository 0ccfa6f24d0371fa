//! Suite runner
//!
//! Runs the scenarios of a suite one after another in a single browser
//! session, logging in once per round.

use anyhow::{bail, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::browser::PageFactory;
use crate::config::{AppConfig, SuiteDefinition};
use crate::logging::events;
use crate::models::{ScenarioResult, ScenarioStatus, SuiteSummary};
use crate::scenarios::{run_scenario, ScenarioCase, ScenarioDefinition, ScenarioRegistry};
use crate::session::ConsoleSession;
use crate::utils::Timer;

/// Sequential runner for one suite
pub struct SuiteRunner {
    config: Arc<AppConfig>,
    factory: Arc<dyn PageFactory>,
    registry: ScenarioRegistry,
}

fn is_case(scenario: &ScenarioDefinition, case: ScenarioCase) -> bool {
    scenario.slug() == case.slug()
}

fn labelled(result: ScenarioResult, scenario: &ScenarioDefinition) -> ScenarioResult {
    result
        .with_number(scenario.number)
        .with_category(scenario.category.clone())
}

impl SuiteRunner {
    pub fn new(
        config: Arc<AppConfig>,
        factory: Arc<dyn PageFactory>,
        registry: ScenarioRegistry,
    ) -> Self {
        Self {
            config,
            factory,
            registry,
        }
    }

    /// Resolve the suite's scenario keys in order, dropping duplicates.
    ///
    /// Register comes first and Login second whether or not the suite lists
    /// them in that order; Login is always part of the plan.
    pub fn plan(&self, suite: &SuiteDefinition) -> Result<Vec<ScenarioDefinition>> {
        let mut planned: Vec<ScenarioDefinition> = Vec::new();
        for key in &suite.scenarios {
            let Some(scenario) = self.registry.resolve(key) else {
                bail!("Unknown scenario '{}' in suite '{}'", key, suite.name);
            };
            if !planned.iter().any(|s| s.slug() == scenario.slug()) {
                planned.push(scenario.clone());
            }
        }

        let register = planned
            .iter()
            .position(|s| is_case(s, ScenarioCase::Register))
            .map(|i| planned.remove(i));
        let login = match planned.iter().position(|s| is_case(s, ScenarioCase::Login)) {
            Some(i) => planned.remove(i),
            None => match self.registry.resolve(ScenarioCase::Login.slug()) {
                Some(login) => login.clone(),
                None => bail!("Login scenario is not defined"),
            },
        };

        let mut ordered = Vec::with_capacity(planned.len() + 2);
        ordered.extend(register);
        ordered.push(login);
        ordered.extend(planned);
        Ok(ordered)
    }

    /// Log in on the session page and run the Login scenario's own checks
    async fn login(&self, session: &mut ConsoleSession, scenario: &ScenarioDefinition) -> (ScenarioResult, bool) {
        let timer = Timer::start("login");
        events::test_start(&scenario.name, &json!({ "email": self.config.login.credentials.email }));

        if let Err(e) = session.login().await {
            error!("Login failed: {}", e);
            let duration_ms = timer.stop();
            events::test_end(&scenario.name, false, duration_ms, &json!({ "error": e.to_string() }));
            session.screenshot("error_login").await;
            let result = ScenarioResult::fail(&scenario.name, duration_ms, e.to_string())
                .with_screenshots(session.take_screenshots());
            return (labelled(result, scenario), false);
        }

        let login_ms = timer.stop();
        let result = run_scenario(session, scenario).await;
        let duration_ms = result.duration_ms + login_ms;
        (result.with_duration(duration_ms), true)
    }

    /// Re-open the browser when the previous scenario lost it
    async fn ensure_page(&self, session: &mut ConsoleSession) -> Result<(), String> {
        if !session.page().is_closed().await {
            return Ok(());
        }
        warn!("Browser page was closed, opening a new one");
        let page = self
            .factory
            .open()
            .await
            .map_err(|e| format!("could not reopen browser: {e}"))?;
        session.replace_page(page);
        session
            .login()
            .await
            .map_err(|e| format!("re-login failed: {e}"))
    }

    /// One pass over the suite in a fresh browser session
    pub async fn run_round(&self, suite: &SuiteDefinition, round: u32) -> Result<SuiteSummary> {
        let plan = self.plan(suite)?;
        info!(
            "Round {} of suite '{}': {} scenario(s)",
            round,
            suite.name,
            plan.len()
        );

        let page = match self.factory.open().await {
            Ok(page) => page,
            Err(e) => {
                error!("Could not start browser: {}", e);
                let results = plan
                    .iter()
                    .map(|s| labelled(ScenarioResult::error(&s.name, e.to_string()), s))
                    .collect();
                return Ok(SuiteSummary::new(round, &suite.name, results));
            }
        };
        let mut session = ConsoleSession::new(page, self.config.clone());
        let mut results = Vec::with_capacity(plan.len());
        let mut remaining = plan.iter().peekable();

        if let Some(register) = remaining.next_if(|s| is_case(s, ScenarioCase::Register)) {
            let result = run_scenario(&mut session, register).await;
            let result = if result.status.is_failure(false) {
                warn!(
                    "Registration did not complete, continuing with login: {}",
                    result.message.as_deref().unwrap_or_default()
                );
                ScenarioResult {
                    status: ScenarioStatus::Unclear,
                    ..result
                }
                .advisory()
            } else {
                result
            };
            results.push(result);
        }

        let mut logged_in = false;
        if let Some(login) = remaining.next() {
            if let Err(reason) = self.ensure_page(&mut session).await {
                results.push(labelled(ScenarioResult::error(&login.name, reason), login));
            } else {
                let (result, ok) = self.login(&mut session, login).await;
                logged_in = ok;
                results.push(result);
            }
        }

        let mut halted = false;
        for scenario in remaining {
            if !logged_in {
                results.push(labelled(ScenarioResult::skip(&scenario.name, "login failed"), scenario));
                continue;
            }
            if halted {
                results.push(labelled(
                    ScenarioResult::skip(&scenario.name, "stopped after an earlier failure"),
                    scenario,
                ));
                continue;
            }

            let result = match self.ensure_page(&mut session).await {
                Ok(()) => run_scenario(&mut session, scenario).await,
                Err(reason) => {
                    error!("{}: {}", scenario.name, reason);
                    labelled(ScenarioResult::error(&scenario.name, reason), scenario)
                }
            };
            info!("  {}", result);
            if suite.stop_on_failure && result.status.is_failure(false) {
                warn!("Stopping suite '{}' after {}", suite.name, result.label());
                halted = true;
            }
            results.push(result);
        }

        let label = format!("{}_round{}", suite.name, round);
        match session.save_browser_logs(&label).await {
            Ok(paths) => info!("Saved {} browser log file(s)", paths.len()),
            Err(e) => warn!("Could not save browser logs: {:#}", e),
        }
        if let Err(e) = session.page().close().await {
            warn!("Closing browser failed: {}", e);
        }

        let summary = SuiteSummary::new(round, &suite.name, results);
        info!(
            "Round {} completed: {}/{} passed ({:.1}%)",
            round,
            summary.passed,
            summary.total,
            summary.pass_rate()
        );
        Ok(summary)
    }

    /// Run `rounds` rounds, each in its own browser session
    pub async fn run_rounds(&self, suite: &SuiteDefinition, rounds: u32) -> Result<Vec<SuiteSummary>> {
        info!("Running {} round(s) of suite '{}'", rounds, suite.name);

        let mut summaries = Vec::new();
        for round in 1..=rounds {
            info!("=== Round {}/{} ===", round, rounds);
            summaries.push(self.run_round(suite, round).await?);
        }
        Ok(summaries)
    }
}
