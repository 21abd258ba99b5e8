//! Progress events emitted while a run is in flight
//!
//! The coordinator pushes events into an unbounded channel so a slow
//! consumer (the terminal progress bar) never stalls the workers.

use std::fmt;

use tokio::sync::mpsc;

use crate::app::models::{TaskKind, TaskReport};

/// Pipeline phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collections at one depth; depth 1 is directly under the root
    Directories { depth: usize },
    /// All regular files
    Files,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Directories { depth } => write!(f, "directories (depth {})", depth),
            Phase::Files => write!(f, "files"),
        }
    }
}

/// Something the progress display may want to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A phase begins; `tasks` is known for directory levels only
    PhaseStarted { phase: Phase, tasks: Option<usize> },
    /// A task reached its final outcome
    TaskFinished {
        path: String,
        kind: TaskKind,
        succeeded: bool,
        bytes: u64,
    },
    /// Every phase has finished
    Finished,
}

impl TransferEvent {
    pub fn from_report(report: &TaskReport) -> Self {
        TransferEvent::TaskFinished {
            path: report.task.path().to_string(),
            kind: report.task.kind(),
            succeeded: report.succeeded(),
            bytes: report
                .outcome
                .as_ref()
                .map(|success| success.bytes())
                .unwrap_or(0),
        }
    }
}

/// Optional event sink; sending never blocks and never fails the run
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<TransferEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<TransferEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: TransferEvent) {
        if let Some(tx) = &self.tx {
            // receiver gone means nobody is watching
            let _ = tx.send(event);
        }
    }
}
