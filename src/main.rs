//! webdav-bulk CLI application
//!
//! Mirrors a local directory tree onto a WebDAV server: MKCOL for every
//! directory, then PUT for every file, across a pool of concurrent workers.
//!
//! Exit status is 0 when every task succeeded, 1 when some tasks failed or
//! the run was cancelled, and 2 when the run could not proceed at all.

use std::process;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use webdav_bulk::app::coordinator::stats::error_chain;
use webdav_bulk::cli::{handle_transfer, Cli};
use webdav_bulk::constants::exit;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(&cli);

    info!("webdav-bulk v{} starting", env!("CARGO_PKG_VERSION"));

    let code = match handle_transfer(&cli.global, cli.transfer).await {
        Ok(summary) => summary.exit_code(),
        Err(e) => {
            error!("Transfer aborted ({}): {}", e.category(), e);
            eprintln!("Error: {}", error_chain(&e));
            exit::FATAL
        }
    };

    process::exit(code);
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("webdav_bulk={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
