//! Command-line interface components
//!
//! Argument parsing, the transfer command handler and the terminal progress
//! display. Everything here sits on top of [`crate::app`] and never the
//! other way round.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, GlobalArgs, TransferArgs};
pub use commands::{apply_overrides, handle_transfer, plan_transfer, print_summary, TransferPlan};
pub use progress::{progress_enabled, ProgressDisplay};
