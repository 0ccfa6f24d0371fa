//! Step engine
//!
//! Runs a scenario's steps in order on the session page. A failing step
//! stops the scenario; an unclear check is noted and the scenario carries on.

use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};

use super::{ScenarioDefinition, Step};
use crate::browser::{BrowserError, BrowserResult, Selector};
use crate::interact::{
    Outcome, QueueOutcome, QueueTraceMonitor, SelectorCascade, SmartWait, SuccessDetector,
    UrlPattern,
};
use crate::logging::events;
use crate::models::{ScenarioResult, ScenarioStatus};
use crate::session::ConsoleSession;
use crate::utils::Stopwatch;

/// What a single step means for the scenario
#[derive(Debug, PartialEq)]
enum StepOutcome {
    Continue,
    Unclear(String),
    Fail(String),
    Skip(String),
}

fn millis(timeout_ms: &Option<u64>, default: Duration) -> Duration {
    timeout_ms.map(Duration::from_millis).unwrap_or(default)
}

fn not_found(error: BrowserError, optional: bool) -> BrowserResult<StepOutcome> {
    match error {
        BrowserError::ElementNotFound { .. } if optional => {
            warn!("Optional element missing: {}", error);
            Ok(StepOutcome::Continue)
        }
        BrowserError::ElementNotFound { .. } => Ok(StepOutcome::Fail(error.to_string())),
        other => Err(other),
    }
}

async fn wait_for(
    session: &ConsoleSession,
    target: &SelectorCascade,
    timeout: Duration,
    visible: bool,
) -> BrowserResult<bool> {
    let page = session.page();
    let outcome = SmartWait::new(timeout)
        .until(move || async move {
            Ok::<_, BrowserError>(target.is_present(page, Duration::ZERO).await? == visible)
        })
        .await?;
    Ok(outcome.is_satisfied())
}

async fn execute_step(session: &mut ConsoleSession, step: &Step) -> BrowserResult<StepOutcome> {
    let timeouts = session.config().timeouts.clone();
    let per_candidate = timeouts.candidate();

    match step {
        Step::Navigate { path } => {
            session.navigate(path).await?;
            Ok(StepOutcome::Continue)
        }

        Step::Click { target, optional } => {
            let target = target.map(|s| session.render(s));
            let page = session.page();
            match target.locate(page, timeouts.element(), per_candidate).await {
                Ok(resolved) => {
                    page.click(&resolved.selector).await?;
                    events::browser_action(
                        "click",
                        &target.description,
                        &json!({ "selector": resolved.selector.to_string(), "candidate": resolved.index + 1 }),
                    );
                    Ok(StepOutcome::Continue)
                }
                Err(e) => not_found(e, *optional),
            }
        }

        Step::Fill { target, value } => {
            let target = target.map(|s| session.render(s));
            let value = session.render(value);
            let page = session.page();
            match target.locate(page, timeouts.element(), per_candidate).await {
                Ok(resolved) => {
                    page.fill(&resolved.selector, &value).await?;
                    events::browser_action(
                        "fill",
                        &target.description,
                        &json!({ "selector": resolved.selector.to_string(), "length": value.chars().count() }),
                    );
                    Ok(StepOutcome::Continue)
                }
                Err(e) => not_found(e, false),
            }
        }

        Step::Upload { target, file } => {
            let target = target.map(|s| session.render(s));
            let file = PathBuf::from(session.render(file));
            let path = match std::fs::canonicalize(&file) {
                Ok(path) => path,
                Err(e) => {
                    return Ok(StepOutcome::Fail(format!(
                        "cannot upload {}: {e}",
                        file.display()
                    )))
                }
            };
            let page = session.page();
            match target.upload(page, &path, timeouts.element()).await {
                Ok(resolved) => {
                    events::browser_action(
                        "upload",
                        &target.description,
                        &json!({ "selector": resolved.selector.to_string(), "file": path.display().to_string() }),
                    );
                    Ok(StepOutcome::Continue)
                }
                Err(e) => not_found(e, false),
            }
        }

        Step::WaitVisible {
            target,
            timeout_ms,
            optional,
        } => {
            let target = target.map(|s| session.render(s));
            let timeout = millis(timeout_ms, timeouts.element());
            if wait_for(session, &target, timeout, true).await? {
                Ok(StepOutcome::Continue)
            } else if *optional {
                warn!("{} did not appear within {}ms", target.description, timeout.as_millis());
                Ok(StepOutcome::Continue)
            } else {
                Ok(StepOutcome::Fail(format!(
                    "{} did not appear within {}ms",
                    target.description,
                    timeout.as_millis()
                )))
            }
        }

        Step::WaitHidden {
            target,
            timeout_ms,
            optional,
        } => {
            let target = target.map(|s| session.render(s));
            let timeout = millis(timeout_ms, timeouts.modal_open());
            if wait_for(session, &target, timeout, false).await? {
                Ok(StepOutcome::Continue)
            } else if *optional {
                warn!("{} still visible after {}ms", target.description, timeout.as_millis());
                Ok(StepOutcome::Continue)
            } else {
                Ok(StepOutcome::Fail(format!(
                    "{} still visible after {}ms",
                    target.description,
                    timeout.as_millis()
                )))
            }
        }

        Step::WaitUrl {
            pattern,
            timeout_ms,
        } => {
            let pattern = session.render(pattern);
            let glob = match UrlPattern::glob(&pattern) {
                Ok(glob) => glob,
                Err(e) => return Ok(StepOutcome::Fail(format!("invalid URL pattern '{pattern}': {e}"))),
            };
            let timeout = millis(timeout_ms, timeouts.navigation());
            let outcome = SmartWait::new(timeout)
                .until_url(session.page(), &glob)
                .await?;
            if outcome.is_satisfied() {
                Ok(StepOutcome::Continue)
            } else {
                let url = session.page().current_url().await.unwrap_or_default();
                Ok(StepOutcome::Fail(format!(
                    "URL {url} did not match {pattern} within {}ms",
                    timeout.as_millis()
                )))
            }
        }

        Step::Pause { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            Ok(StepOutcome::Continue)
        }

        Step::Screenshot { name } => {
            session.screenshot(name).await;
            Ok(StepOutcome::Continue)
        }

        Step::ExpectOutcome {
            success,
            verify,
            required,
            timeout_ms,
        } => {
            let success: Vec<String> = success.iter().map(|s| session.render(s)).collect();
            let verify: Vec<String> = verify.iter().map(|s| session.render(s)).collect();
            let timeout = millis(timeout_ms, timeouts.validation());
            let detector = SuccessDetector::from_validation(&session.config().validation)
                .with_success_patterns(&success)
                .with_verify_selectors(&verify);

            match detector.detect(session.page(), timeout).await? {
                Outcome::Success(text) => {
                    info!("Success indicator: {}", text);
                    Ok(StepOutcome::Continue)
                }
                Outcome::Failure(text) => Ok(StepOutcome::Fail(format!("error shown: {text}"))),
                Outcome::Unclear if *required => Ok(StepOutcome::Fail(format!(
                    "no success indicator within {}ms",
                    timeout.as_millis()
                ))),
                Outcome::Unclear => Ok(StepOutcome::Unclear(format!(
                    "no success indicator within {}ms",
                    timeout.as_millis()
                ))),
            }
        }

        Step::MonitorQueue { timeout_ms, close } => {
            let monitor = QueueTraceMonitor::from_timeouts(&timeouts)
                .with_timeout(millis(timeout_ms, timeouts.queue()))
                .with_close(*close);
            let report = monitor.monitor(session.page()).await?;
            session.set_var("last_queue_outcome", report.outcome.to_string());

            let detail = report
                .last_text
                .as_deref()
                .map(|t| t.lines().last().unwrap_or(t).trim().to_string())
                .unwrap_or_default();
            match report.outcome {
                QueueOutcome::Completed => Ok(StepOutcome::Continue),
                QueueOutcome::Failed | QueueOutcome::Cancelled => Ok(StepOutcome::Fail(format!(
                    "queue item {}: {}",
                    report.outcome, detail
                ))),
                QueueOutcome::TimedOut | QueueOutcome::DialogMissing => Ok(StepOutcome::Unclear(
                    format!("queue item {} after {} poll(s)", report.outcome, report.polls),
                )),
            }
        }

        Step::PickRow {
            rows,
            column,
            skip,
            require,
            save_as,
        } => {
            let rows = session.render(rows);
            let row_selector = Selector::parse(&rows)?;
            let protected: Vec<String> = skip
                .iter()
                .flat_map(|entry| {
                    session
                        .render(entry)
                        .split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect::<Vec<_>>()
                })
                .collect();

            let table = session.page().row_cells(&row_selector).await?;
            for cells in table {
                let Some(cell) = cells.get(*column).map(|c| c.trim().to_string()) else {
                    continue;
                };
                if cell.is_empty() || protected.iter().any(|p| cell.contains(p.as_str())) {
                    debug!("Skipping protected row: {}", cell);
                    continue;
                }
                if let Some(require) = require {
                    let selector = Selector::parse(&session.render(&require.replace("{value}", &cell)))?;
                    if session.page().count_visible(&selector).await? == 0 {
                        debug!("Row {} lacks the required control", cell);
                        continue;
                    }
                }
                info!("Picked {} = {}", save_as, cell);
                session.set_var(save_as.clone(), cell);
                return Ok(StepOutcome::Continue);
            }

            Ok(StepOutcome::Skip(format!("no suitable target in {rows}")))
        }

        Step::Set { name, value } => {
            let value = session.render(value);
            debug!("Set {} = {}", name, value);
            session.set_var(name.clone(), value);
            Ok(StepOutcome::Continue)
        }

        Step::Dump { label } => {
            let label = session.render(label);
            if let Err(e) = session.dump(&label, json!({ "reason": "requested" })).await {
                warn!("Debug dump failed: {:#}", e);
            }
            Ok(StepOutcome::Continue)
        }
    }
}

/// Run `scenario` on the session page and classify the result
pub async fn run_scenario(
    session: &mut ConsoleSession,
    scenario: &ScenarioDefinition,
) -> ScenarioResult {
    let span = info_span!("scenario", name = %scenario.name, number = ?scenario.number);
    run_steps(session, scenario).instrument(span).await
}

async fn run_steps(session: &mut ConsoleSession, scenario: &ScenarioDefinition) -> ScenarioResult {
    let name = scenario.name.as_str();
    events::test_start(
        name,
        &json!({
            "number": scenario.number,
            "category": scenario.category,
            "steps": scenario.steps.len(),
        }),
    );

    let mut stopwatch = Stopwatch::new();
    let mut unclear = Vec::new();
    let mut stopped: Option<(ScenarioStatus, String)> = None;
    let mut failed_step = None;

    for (index, step) in scenario.steps.iter().enumerate() {
        let label = format!("{}. {}", index + 1, step.describe());
        events::test_step(name, &label, "start");

        let outcome = execute_step(session, step).await;
        stopwatch.lap(label.clone());

        match outcome {
            Ok(StepOutcome::Continue) => events::test_step(name, &label, "ok"),
            Ok(StepOutcome::Unclear(note)) => {
                warn!("{}: {}", label, note);
                events::test_step(name, &label, "unclear");
                unclear.push(format!("{label}: {note}"));
            }
            Ok(StepOutcome::Fail(message)) => {
                events::test_step(name, &label, "failed");
                stopped = Some((ScenarioStatus::Fail, format!("{label}: {message}")));
            }
            Ok(StepOutcome::Skip(reason)) => {
                events::test_step(name, &label, "skipped");
                stopped = Some((ScenarioStatus::Skip, reason));
            }
            Err(e) => {
                events::test_step(name, &label, "error");
                stopped = Some((ScenarioStatus::Error, format!("{label}: {e}")));
            }
        }

        if stopped.is_some() {
            failed_step = Some(label);
            break;
        }
    }

    let (status, message) = match stopped {
        Some((status, message)) => (status, Some(message)),
        None if !unclear.is_empty() => (ScenarioStatus::Unclear, Some(unclear.join("; "))),
        None => (ScenarioStatus::Pass, None),
    };

    let slug = scenario.slug();
    if matches!(status, ScenarioStatus::Fail | ScenarioStatus::Error)
        && session.config().screenshots.on_error
    {
        session.screenshot(&format!("error_{slug}")).await;
    }
    if status == ScenarioStatus::Error {
        let extra = json!({
            "scenario": name,
            "step": failed_step,
            "error": message,
        });
        if let Err(e) = session.dump(&format!("error_{slug}"), extra).await {
            warn!("Debug dump failed: {:#}", e);
        }
    }

    let duration_ms = stopwatch.total_ms();
    let details = json!({
        "steps": stopwatch.to_json(),
        "failedStep": failed_step,
        "unclear": unclear,
    });

    events::test_end(
        name,
        !status.is_failure(false),
        duration_ms,
        &json!({ "status": status.to_string(), "message": message }),
    );

    let result = match (status, message) {
        (ScenarioStatus::Pass, _) => ScenarioResult::pass(name, duration_ms),
        (ScenarioStatus::Fail, Some(m)) => ScenarioResult::fail(name, duration_ms, m),
        (ScenarioStatus::Unclear, Some(m)) => ScenarioResult::unclear(name, duration_ms, m),
        (ScenarioStatus::Skip, Some(m)) => ScenarioResult::skip(name, m).with_duration(duration_ms),
        (_, m) => ScenarioResult::error(name, m.unwrap_or_default()).with_duration(duration_ms),
    };

    result
        .with_number(scenario.number)
        .with_category(scenario.category.clone())
        .with_details(details)
        .with_screenshots(session.take_screenshots())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{Effect, FakePage};
    use crate::session::tests::test_config;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    const CREATE: &str = "[data-testid=\"system-create-team-button\"]";
    const NAME: &str = "[data-testid=\"resource-modal-field-teamName-input\"]";
    const OK: &str = "[data-testid=\"resource-modal-ok-button\"]";

    fn session(page: Arc<FakePage>) -> (ConsoleSession, TempDir) {
        let dir = tempdir().unwrap();
        let session = ConsoleSession::new(page, Arc::new(test_config(dir.path())));
        (session, dir)
    }

    fn scenario(steps: Vec<Step>) -> ScenarioDefinition {
        ScenarioDefinition {
            name: "Create Team".to_string(),
            number: Some(19),
            category: "System".to_string(),
            description: String::new(),
            steps,
        }
    }

    fn team_steps() -> Vec<Step> {
        vec![
            Step::navigate("/console/system"),
            Step::click(SelectorCascade::new("create team", [CREATE])),
            Step::fill(SelectorCascade::new("team name", [NAME]), "{session_team}"),
            Step::click(SelectorCascade::new("ok", ["button:has-text(\"Create\")", OK])),
            Step::expect(["team created"]),
        ]
    }

    #[tokio::test]
    async fn test_scenario_passes() {
        let page = FakePage::new("about:blank")
            .element(CREATE, "Create Team")
            .hidden(NAME)
            .on_click(CREATE, Effect::Show(NAME.to_string(), String::new()))
            .element(OK, "OK")
            .on_click(OK, Effect::Show(".ant-message".to_string(), "Team created".to_string()))
            .shared();
        let (mut session, _dir) = session(page.clone());

        let result = run_scenario(&mut session, &scenario(team_steps())).await;

        assert_eq!(result.status, ScenarioStatus::Pass, "{:?}", result.message);
        assert_eq!(result.number, Some(19));
        assert_eq!(result.category, "System");
        let team = page.value_of(NAME).unwrap();
        assert!(team.starts_with("e2e_team_"));
        assert_eq!(result.details.unwrap()["steps"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_error_phrase_fails_and_screenshots() {
        let page = FakePage::new("about:blank")
            .element(CREATE, "Create Team")
            .element(NAME, "")
            .element(OK, "OK")
            .on_click(OK, Effect::Show(".ant-message".to_string(), "Team already exists".to_string()))
            .shared();
        let (mut session, _dir) = session(page);

        let result = run_scenario(&mut session, &scenario(team_steps())).await;

        assert_eq!(result.status, ScenarioStatus::Fail);
        assert!(result.message.unwrap().contains("already exists"));
        assert_eq!(result.screenshots.len(), 1);
        assert!(result.screenshots[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("error_create_team_"));
    }

    #[tokio::test]
    async fn test_upload_attaches_existing_file_only() {
        let page = FakePage::new("about:blank")
            .hidden("input[type=\"file\"]")
            .shared();
        let (mut session, dir) = session(page.clone());
        let conf = dir.path().join("rclone.conf");
        std::fs::write(&conf, "[microsoft]\ntype = azureblob\n").unwrap();
        let input = SelectorCascade::new("rclone config input", ["input[type=\"file\"]"]);

        let uploaded = scenario(vec![Step::upload(input.clone(), conf.display().to_string())]);
        let result = run_scenario(&mut session, &uploaded).await;
        assert_eq!(result.status, ScenarioStatus::Pass, "{:?}", result.message);
        assert_eq!(page.uploads()[0].1, std::fs::canonicalize(&conf).unwrap());

        let missing = dir.path().join("missing.conf").display().to_string();
        let result = run_scenario(&mut session, &scenario(vec![Step::upload(input, missing)])).await;
        assert_eq!(result.status, ScenarioStatus::Fail);
        assert!(result.message.unwrap().contains("cannot upload"));
        assert_eq!(page.uploads().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_element_fails_unless_optional() {
        let page = FakePage::new("about:blank").shared();
        let (mut session, _dir) = session(page);

        let optional = scenario(vec![Step::click_optional(SelectorCascade::new("banner", [".banner"]))]);
        assert_eq!(run_scenario(&mut session, &optional).await.status, ScenarioStatus::Pass);

        let required = scenario(vec![
            Step::click(SelectorCascade::new("create team", [CREATE])),
            Step::screenshot("never"),
        ]);
        let result = run_scenario(&mut session, &required).await;
        assert_eq!(result.status, ScenarioStatus::Fail);
        assert!(result.message.unwrap().starts_with("1. click create team"));
        assert_eq!(result.details.unwrap()["failedStep"], "1. click create team");
    }

    #[tokio::test]
    async fn test_unclear_outcome_continues() {
        let page = FakePage::new("about:blank").body("nothing here").shared();
        let (mut session, _dir) = session(page);

        let result = run_scenario(
            &mut session,
            &scenario(vec![Step::expect(["team created"]), Step::set("after", "yes")]),
        )
        .await;
        assert_eq!(result.status, ScenarioStatus::Unclear);
        assert_eq!(session.var("after"), Some("yes"));

        let strict = scenario(vec![Step::expect(["team created"]).required()]);
        assert_eq!(run_scenario(&mut session, &strict).await.status, ScenarioStatus::Fail);
    }

    #[tokio::test]
    async fn test_queue_outcomes() {
        let dialog = "[data-testid=\"queue-trace-modal\"]";
        let page = FakePage::new("about:blank")
            .text_sequence(dialog, &["Status: PENDING", "Status: PROCESSING", "Status: FAILED\nDisk full"])
            .shared();
        let (mut session, _dir) = session(page);

        let result = run_scenario(&mut session, &scenario(vec![Step::monitor_queue()])).await;
        assert_eq!(result.status, ScenarioStatus::Fail);
        assert!(result.message.unwrap().contains("Disk full"));
        assert_eq!(session.var("last_queue_outcome"), Some("failed"));

        let missing = FakePage::new("about:blank").shared();
        let (mut session, _dir) = self::session(missing);
        let result = run_scenario(&mut session, &scenario(vec![Step::monitor_queue()])).await;
        assert_eq!(result.status, ScenarioStatus::Unclear);
    }

    #[tokio::test]
    async fn test_pick_row_selects_or_skips() {
        let rows = "[data-testid=\"system-user-table\"] tbody tr";
        let page = FakePage::new("about:blank")
            .rows(
                rows,
                &[
                    &["admin@rediacc.io", "Active"],
                    &["bob@example.com", "Active"],
                    &["carol@example.com", "Active"],
                ],
            )
            .element("[data-testid=\"deactivate-carol@example.com\"]", "Deactivate")
            .shared();
        let (mut session, _dir) = session(page);

        let pick = Step::pick_row(
            rows,
            0,
            &["{protected_users}"],
            Some("[data-testid=\"deactivate-{value}\"]"),
            "target_user",
        );
        let result = run_scenario(&mut session, &scenario(vec![pick])).await;
        assert_eq!(result.status, ScenarioStatus::Pass);
        assert_eq!(session.var("target_user"), Some("carol@example.com"));

        let none = Step::pick_row(
            rows,
            0,
            &["admin@rediacc.io,bob@example.com", "carol"],
            None,
            "target_user",
        );
        let result = run_scenario(&mut session, &scenario(vec![none, Step::screenshot("never")])).await;
        assert_eq!(result.status, ScenarioStatus::Skip);
        assert!(result.screenshots.is_empty());
    }

    #[tokio::test]
    async fn test_closed_browser_is_error_with_dump() {
        let page = FakePage::new("about:blank").shared();
        page.set_closed();
        let (mut session, dir) = session(page);

        let result = run_scenario(&mut session, &scenario(vec![Step::navigate("/console")])).await;
        assert_eq!(result.status, ScenarioStatus::Error);
        assert!(result.message.unwrap().contains("closed"));

        let dumps: Vec<_> = std::fs::read_dir(dir.path().join("dumps")).unwrap().collect();
        assert_eq!(dumps.len(), 1);
    }

    #[tokio::test]
    async fn test_wait_url_and_set() {
        let page = FakePage::new("http://console.test/console/dashboard").shared();
        let (mut session, _dir) = session(page);

        let steps = vec![
            Step::wait_url("**/console/dashboard"),
            Step::set("repo", "{session_repo}_copy"),
            Step::wait_url("**/console/never").with_timeout(10),
        ];
        let result = run_scenario(&mut session, &scenario(steps)).await;
        assert_eq!(result.status, ScenarioStatus::Fail);
        assert!(session.var("repo").unwrap().ends_with("_copy"));
    }
}
