//! Queue Item Trace monitoring
//!
//! Long-running console operations (repository up/down/push, machine checks)
//! open a "Queue Item Trace" dialog whose status text eventually settles on a
//! terminal keyword.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cascade::SelectorCascade;
use super::wait::SmartWait;
use crate::browser::{BrowserError, BrowserResult, Page};
use crate::config::Timeouts;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueOutcome {
    Completed,
    Failed,
    Cancelled,
    TimedOut,
    DialogMissing,
}

impl QueueOutcome {
    /// Map dialog text to a terminal state, if it shows one
    pub fn classify(text: &str) -> Option<QueueOutcome> {
        if text.contains("COMPLETED") || text.contains("Task Completed Successfully") {
            Some(QueueOutcome::Completed)
        } else if text.contains("FAILED") {
            Some(QueueOutcome::Failed)
        } else if text.contains("CANCELLED") || text.contains("CANCELED") {
            Some(QueueOutcome::Cancelled)
        } else {
            None
        }
    }
}

impl fmt::Display for QueueOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QueueOutcome::Completed => "completed",
            QueueOutcome::Failed => "failed",
            QueueOutcome::Cancelled => "cancelled",
            QueueOutcome::TimedOut => "timed out",
            QueueOutcome::DialogMissing => "dialog missing",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueReport {
    pub outcome: QueueOutcome,
    pub polls: u32,
    pub elapsed_ms: u64,
    pub last_text: Option<String>,
}

#[derive(Clone, Debug)]
pub struct QueueTraceMonitor {
    pub dialog: SelectorCascade,
    pub close_button: SelectorCascade,
    pub appear_timeout: Duration,
    pub candidate_timeout: Duration,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub close_when_done: bool,
}

impl Default for QueueTraceMonitor {
    fn default() -> Self {
        Self {
            dialog: SelectorCascade::new(
                "Queue Item Trace dialog",
                [
                    "[data-testid=\"queue-trace-modal\"]",
                    ".ant-modal:has-text(\"Queue Item Trace\")",
                    "[role=\"dialog\"]:has-text(\"Queue Item Trace\")",
                ],
            ),
            close_button: SelectorCascade::new(
                "Queue Item Trace close button",
                [
                    "[data-testid=\"queue-trace-close-button\"]",
                    ".ant-modal-footer button:has-text(\"Close\")",
                    "button.ant-modal-close",
                ],
            ),
            appear_timeout: Duration::from_secs(30),
            candidate_timeout: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            close_when_done: true,
        }
    }
}

impl QueueTraceMonitor {
    pub fn from_timeouts(timeouts: &Timeouts) -> Self {
        Self {
            appear_timeout: timeouts.queue_appear(),
            candidate_timeout: timeouts.candidate(),
            timeout: timeouts.queue(),
            poll_interval: timeouts.poll_interval(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_close(mut self, close: bool) -> Self {
        self.close_when_done = close;
        self
    }

    /// Wait for the dialog, then poll its text until a terminal keyword.
    /// `appear_timeout` bounds the wait for any candidate, not each one.
    pub async fn monitor(&self, page: &dyn Page) -> BrowserResult<QueueReport> {
        let started = Instant::now();

        let located = self
            .dialog
            .locate(page, self.appear_timeout, self.candidate_timeout)
            .await;
        let dialog = match located {
            Ok(resolved) => resolved.selector,
            Err(BrowserError::ElementNotFound { .. }) => {
                warn!("Queue Item Trace dialog did not appear");
                return Ok(QueueReport {
                    outcome: QueueOutcome::DialogMissing,
                    polls: 0,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    last_text: None,
                });
            }
            Err(e) => return Err(e),
        };
        info!("Monitoring Queue Item Trace ({} max)", humanize(self.timeout));

        let deadline = Instant::now() + self.timeout;
        let mut polls = 0u32;
        let mut last_text = None;
        let outcome = loop {
            polls += 1;
            match page.texts(&dialog).await {
                Ok(texts) => {
                    if let Some(text) = texts.last() {
                        if let Some(outcome) = QueueOutcome::classify(text) {
                            last_text = Some(text.clone());
                            break outcome;
                        }
                        last_text = Some(text.clone());
                    }
                }
                Err(BrowserError::SessionClosed) => return Err(BrowserError::SessionClosed),
                Err(e) => debug!("Queue trace poll failed: {}", e),
            }

            let now = Instant::now();
            if now >= deadline {
                break QueueOutcome::TimedOut;
            }
            if polls % 10 == 0 {
                debug!("Still waiting on queue item after {} polls", polls);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        };

        info!("Queue item {} after {} poll(s)", outcome, polls);

        if self.close_when_done {
            self.close(page).await;
        }

        Ok(QueueReport {
            outcome,
            polls,
            elapsed_ms: started.elapsed().as_millis() as u64,
            last_text,
        })
    }

    async fn close(&self, page: &dyn Page) {
        match self.close_button.click(page, Duration::from_secs(1)).await {
            Ok(_) => {
                let wait = SmartWait::new(Duration::from_secs(2));
                for candidate in &self.dialog.selectors {
                    if let Ok(selector) = crate::browser::Selector::parse(candidate) {
                        let _ = wait.until_hidden(page, &selector).await;
                    }
                }
            }
            Err(e) => warn!("Could not close Queue Item Trace dialog: {}", e),
        }
    }
}

fn humanize(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{Effect, FakePage};

    fn fast_monitor() -> QueueTraceMonitor {
        QueueTraceMonitor {
            appear_timeout: Duration::from_millis(20),
            candidate_timeout: Duration::from_millis(5),
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(2),
            ..QueueTraceMonitor::default()
        }
    }

    #[test]
    fn test_classify_keywords() {
        assert_eq!(
            QueueOutcome::classify("Status: COMPLETED"),
            Some(QueueOutcome::Completed)
        );
        assert_eq!(
            QueueOutcome::classify("Task Completed Successfully"),
            Some(QueueOutcome::Completed)
        );
        assert_eq!(QueueOutcome::classify("FAILED"), Some(QueueOutcome::Failed));
        assert_eq!(
            QueueOutcome::classify("CANCELED by user"),
            Some(QueueOutcome::Cancelled)
        );
        assert_eq!(QueueOutcome::classify("PROCESSING"), None);
    }

    #[tokio::test]
    async fn test_monitor_until_completed_and_close() {
        let dialog = ".ant-modal:has-text(\"Queue Item Trace\")";
        let page = FakePage::new("about:blank")
            .text_sequence(
                dialog,
                &["Queue Item Trace PENDING", "Queue Item Trace PROCESSING", "Queue Item Trace COMPLETED"],
            )
            .element("[data-testid=\"queue-trace-close-button\"]", "Close")
            .on_click(
                "[data-testid=\"queue-trace-close-button\"]",
                Effect::Hide(dialog.to_string()),
            );

        let report = fast_monitor().monitor(&page).await.unwrap();
        assert_eq!(report.outcome, QueueOutcome::Completed);
        assert_eq!(report.polls, 3);
        assert!(page.clicked("[data-testid=\"queue-trace-close-button\"]"));
    }

    #[tokio::test]
    async fn test_monitor_dialog_missing() {
        let page = FakePage::new("about:blank");
        let report = fast_monitor().monitor(&page).await.unwrap();
        assert_eq!(report.outcome, QueueOutcome::DialogMissing);
        assert_eq!(report.polls, 0);
    }

    #[tokio::test]
    async fn test_monitor_times_out() {
        let page = FakePage::new("about:blank")
            .element("[data-testid=\"queue-trace-modal\"]", "PROCESSING");
        let monitor = fast_monitor()
            .with_timeout(Duration::from_millis(15))
            .with_close(false);
        let report = monitor.monitor(&page).await.unwrap();
        assert_eq!(report.outcome, QueueOutcome::TimedOut);
        assert_eq!(report.last_text.as_deref(), Some("PROCESSING"));
    }

    #[tokio::test]
    async fn test_monitor_finds_later_candidate_without_waiting_on_earlier_ones() {
        let page = FakePage::new("about:blank")
            .element(".ant-modal:has-text(\"Queue Item Trace\")", "Queue Item Trace COMPLETED");
        let monitor = QueueTraceMonitor {
            appear_timeout: Duration::from_millis(1500),
            candidate_timeout: Duration::from_millis(10),
            ..QueueTraceMonitor::default()
        }
        .with_close(false);

        let started = std::time::Instant::now();
        let report = monitor.monitor(&page).await.unwrap();
        assert_eq!(report.outcome, QueueOutcome::Completed);
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_dialog_missing_bounded_by_appear_timeout() {
        let page = FakePage::new("about:blank");
        let monitor = QueueTraceMonitor {
            appear_timeout: Duration::from_millis(100),
            candidate_timeout: Duration::from_millis(100),
            ..QueueTraceMonitor::default()
        };

        let started = std::time::Instant::now();
        let report = monitor.monitor(&page).await.unwrap();
        assert_eq!(report.outcome, QueueOutcome::DialogMissing);
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize(Duration::from_secs(120)), "2m0s");
        assert_eq!(humanize(Duration::from_secs(45)), "45s");
    }
}
