//! Run summary built from task reports
//!
//! Every task that was enumerated ends up here exactly once, either as a
//! success or as a failure with its reason. The summary decides the exit code.

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::models::{TaskKind, TaskReport, TaskSuccess};
use crate::constants::exit;
use crate::errors::TransferError;

/// One task that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTask {
    pub path: String,
    pub kind: TaskKind,
    pub category: String,
    pub reason: String,
}

/// Final statistics of a transfer run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSummary {
    pub started_at: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub directories_created: usize,
    pub directories_existing: usize,
    pub files_uploaded: usize,
    pub bytes_uploaded: u64,
    /// Dispatched tasks that failed
    pub failed: usize,
    /// Tasks never dispatched (parent failed or run cancelled)
    pub skipped: usize,
    /// Extra attempts spent on retries
    pub retries: u64,
    pub cancelled: bool,
    pub failures: Vec<FailedTask>,
}

impl TransferSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration: Duration::ZERO,
            directories_created: 0,
            directories_existing: 0,
            files_uploaded: 0,
            bytes_uploaded: 0,
            failed: 0,
            skipped: 0,
            retries: 0,
            cancelled: false,
            failures: Vec::new(),
        }
    }

    /// Fold one report into the totals
    pub fn record(&mut self, report: &TaskReport) {
        self.retries += u64::from(report.attempts.saturating_sub(1));

        match &report.outcome {
            Ok(TaskSuccess::Created) => self.directories_created += 1,
            Ok(TaskSuccess::AlreadyExists) => self.directories_existing += 1,
            Ok(TaskSuccess::Uploaded { bytes }) => {
                self.files_uploaded += 1;
                self.bytes_uploaded += bytes;
            }
            Err(e) => {
                match e {
                    TransferError::ParentFailed { .. } | TransferError::Cancelled => {
                        self.skipped += 1
                    }
                    _ => self.failed += 1,
                }
                self.failures.push(FailedTask {
                    path: report.task.path().to_string(),
                    kind: report.task.kind(),
                    category: e.category().to_string(),
                    reason: error_chain(e),
                });
            }
        }
    }

    pub fn succeeded(&self) -> usize {
        self.directories_created + self.directories_existing + self.files_uploaded
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failed + self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && !self.cancelled
    }

    /// Process exit code: 0 when every task succeeded, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            exit::SUCCESS
        } else {
            exit::TASKS_FAILED
        }
    }

    /// Human-readable multi-line summary
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Transfer summary");
        let _ = writeln!(
            out,
            "  Directories: {} created, {} already present",
            self.directories_created, self.directories_existing
        );
        let _ = writeln!(
            out,
            "  Files:       {} uploaded ({} bytes)",
            self.files_uploaded, self.bytes_uploaded
        );
        let _ = writeln!(
            out,
            "  Failed:      {} failed, {} skipped, {} retries",
            self.failed, self.skipped, self.retries
        );
        let _ = writeln!(
            out,
            "  Duration:    {}",
            humantime_serde::re::humantime::format_duration(round_to_millis(self.duration))
        );
        if self.cancelled {
            let _ = writeln!(out, "  Run was cancelled before completion");
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "\nFailures:");
            for failure in &self.failures {
                let _ = writeln!(
                    out,
                    "  [{}] {} {}: {}",
                    failure.category, failure.kind, failure.path, failure.reason
                );
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn round_to_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}

/// Error message with its source chain, `outer: inner: root`
pub fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(message, ": {}", cause);
        source = cause.source();
    }
    message
}
