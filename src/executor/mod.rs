//! Suite execution
//!
//! Sequential scenario runs per round and statistics across rounds.

mod aggregate;
mod runner;

pub use aggregate::AggregateResult;
pub use runner::SuiteRunner;
