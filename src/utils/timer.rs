//! Timing helpers

use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Elapsed-time measurement for one operation
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Stop and log the elapsed time at debug level
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("{}: {}ms", self.label, elapsed);
        elapsed
    }
}

/// Stopwatch with named laps, one per scenario step
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    last: Instant,
    laps: Vec<(String, Duration)>,
}

impl Stopwatch {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            laps: Vec::new(),
        }
    }

    /// Close the current lap and return its length
    pub fn lap(&mut self, label: impl Into<String>) -> Duration {
        let now = Instant::now();
        let lap = now - self.last;
        self.last = now;
        self.laps.push((label.into(), lap));
        lap
    }

    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn total_ms(&self) -> u64 {
        self.total().as_millis() as u64
    }

    /// Individual lap lengths in recording order
    pub fn laps(&self) -> &[(String, Duration)] {
        &self.laps
    }

    /// Laps as `[{ "step": .., "ms": .. }]` for result details
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.laps
                .iter()
                .map(|(label, lap)| json!({ "step": label, "ms": lap.as_millis() as u64 }))
                .collect(),
        )
    }

    pub fn format(&self) -> String {
        let mut output = String::new();
        for (label, duration) in &self.laps {
            output.push_str(&format!("{}: {}ms\n", label, duration.as_millis()));
        }
        output.push_str(&format!("Total: {}ms", self.total().as_millis()));
        output
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
