//! Data models shared by the runner, formatters and result storage

mod scenario_result;

pub use scenario_result::{ScenarioResult, ScenarioStatus, SuiteSummary};
