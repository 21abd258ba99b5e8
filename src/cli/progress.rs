//! Terminal progress display
//!
//! A single indicatif bar follows the coordinator's phases: a counted bar
//! for each directory level, then a spinner with a running file count and
//! byte total for the file phase, whose size is not known up front.

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::coordinator::{EventSink, Phase, TransferEvent};

const LEVEL_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
const FILES_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {pos} files {msg}";

/// Whether a progress bar should be drawn at all
pub fn progress_enabled(no_progress: bool, quiet: bool) -> bool {
    !no_progress && !quiet && atty::is(atty::Stream::Stderr)
}

/// Background task drawing progress from coordinator events
pub struct ProgressDisplay {
    handle: Option<JoinHandle<()>>,
}

impl ProgressDisplay {
    /// Start the display; returns the sink to hand to the coordinator
    pub fn start(enabled: bool) -> (EventSink, Self) {
        if !enabled {
            return (EventSink::disabled(), Self { handle: None });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(render(rx));
        (EventSink::new(tx), Self { handle: Some(handle) })
    }

    /// Wait for the display to draw its last frame
    pub async fn finish(self) {
        if let Some(handle) = self.handle {
            if let Err(e) = handle.await {
                debug!("Progress display task failed: {}", e);
            }
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

async fn render(mut rx: mpsc::UnboundedReceiver<TransferEvent>) {
    let bar = ProgressBar::new(0);
    let mut bytes = 0u64;
    let mut failed = 0usize;
    let mut uploading = false;

    while let Some(event) = rx.recv().await {
        match event {
            TransferEvent::PhaseStarted {
                phase: Phase::Directories { depth },
                tasks,
            } => {
                bar.set_style(style(LEVEL_TEMPLATE));
                bar.set_length(tasks.unwrap_or(0) as u64);
                bar.set_position(0);
                bar.set_message(format!("creating directories (depth {})", depth));
            }
            TransferEvent::PhaseStarted {
                phase: Phase::Files,
                ..
            } => {
                uploading = true;
                bar.set_style(style(FILES_TEMPLATE));
                bar.set_position(0);
                bar.set_message("uploading");
            }
            TransferEvent::TaskFinished {
                succeeded,
                bytes: task_bytes,
                ..
            } => {
                bytes += task_bytes;
                if !succeeded {
                    failed += 1;
                }
                bar.inc(1);
                if uploading {
                    bar.set_message(match failed {
                        0 => format!("{}", HumanBytes(bytes)),
                        n => format!("{} ({} failed)", HumanBytes(bytes), n),
                    });
                }
            }
            TransferEvent::Finished => break,
        }
    }

    bar.finish_and_clear();
}
