//! Small shared helpers

mod timer;

pub use timer::{Stopwatch, Timer};
