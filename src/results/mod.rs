//! Results storage and reporting module
//!
//! Persistent run history, run-to-run comparison and reports.

mod compare;
mod report;
mod storage;

pub use compare::{ComparisonFormatter, RunComparator};
pub use report::{ReportFormat, ReportGenerator};
pub use storage::{EnvironmentInfo, ExportFormat, ResultsStorage, StoredRun};
