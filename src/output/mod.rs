//! Output formatting module
//!
//! Renders scenario results for the terminal and for files.

mod formatter;

pub use formatter::{results_csv, write_results_to_file, OutputFormat, ResultFormatter};
