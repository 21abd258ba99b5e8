//! Command handler for the transfer
//!
//! Wires the parsed arguments and configuration file into the client,
//! coordinator and progress display, and prints the final summary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::app::{looks_like_url, parse_target, Coordinator, Enumerator, SignalHandler};
use crate::app::{TransferSummary, WebDavClient};
use crate::auth::{resolve_credentials, strip_userinfo, CredentialSources};
use crate::cli::progress::{progress_enabled, ProgressDisplay};
use crate::cli::{GlobalArgs, TransferArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, ConfigError, ConfigResult, Result};

/// Where the data comes from and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub local_root: PathBuf,
    pub target: Url,
}

/// Decide the direction from the positional arguments and validate both ends
///
/// The target keeps any userinfo so credentials can be read from it.
pub fn plan_transfer(source: &str, dest: &str) -> ConfigResult<TransferPlan> {
    if looks_like_url(source) && !looks_like_url(dest) {
        return Err(ConfigError::DownloadUnsupported);
    }

    let local_root = PathBuf::from(source);
    if !local_root.is_dir() {
        return Err(ConfigError::LocalRootInvalid { path: local_root });
    }

    let target = parse_target(dest)?;
    Ok(TransferPlan { local_root, target })
}

/// Layer command-line flags over the loaded configuration
pub fn apply_overrides(config: &mut AppConfig, args: &TransferArgs) {
    if let Some(workers) = args.workers {
        config.workers.worker_count = workers;
    }
    if let Some(retries) = args.max_retries {
        config.retry.max_retries = retries;
    }
    if let Some(secs) = args.timeout {
        config.client.request_timeout = Duration::from_secs(secs);
    }
    config.auth.digest |= args.digest;
    config.client.pool_max_per_host = config
        .client
        .pool_max_per_host
        .max(config.workers.worker_count);
}

/// Handle the transfer: authenticate, run every phase, report
///
/// Task failures are part of the returned summary; errors are reserved for
/// problems that stop the run as a whole.
pub async fn handle_transfer(global: &GlobalArgs, args: TransferArgs) -> Result<TransferSummary> {
    args.validate()?;
    let plan = plan_transfer(&args.source, &args.dest)?;

    let mut config = AppConfig::load(global.config.as_deref()).await?;
    apply_overrides(&mut config, &args);
    config.workers.validate()?;
    debug!("Effective configuration: {:?}", config);

    let username = args.username.clone().or_else(|| config.auth.username.clone());
    let sources = CredentialSources::gather(username, args.password.clone(), &plan.target);
    let credentials = resolve_credentials(sources)?;
    let base_url = strip_userinfo(&plan.target);

    info!(
        "Uploading {} to {}",
        plan.local_root.display(),
        base_url.as_str()
    );

    let client = WebDavClient::connect(
        &config.client,
        base_url,
        credentials.as_ref(),
        config.auth.digest,
    )
    .await?;
    let cancel = CancellationToken::new();
    let dispatcher = client
        .into_dispatcher(&plan.local_root, config.retry.clone())?
        .with_cancel(cancel.clone());

    let signals = SignalHandler::new(cancel.clone()).setup();
    let (events, display) =
        ProgressDisplay::start(progress_enabled(global.no_progress, global.quiet));

    let coordinator = Coordinator::new(
        Enumerator::new(&plan.local_root),
        Arc::new(dispatcher),
        config.workers.clone(),
        cancel,
    )
    .with_events(events);

    let result = coordinator.run().await;
    // the display exits on the Finished event; drop the sink for error paths
    drop(coordinator);
    display.finish().await;
    signals.abort();

    let summary = result?;
    print_summary(global, &summary)?;
    Ok(summary)
}

/// Print the summary on stdout in the requested format
pub fn print_summary(global: &GlobalArgs, summary: &TransferSummary) -> Result<()> {
    if global.json_summary {
        let json = summary
            .to_json()
            .map_err(|e| AppError::generic(format!("Failed to encode summary: {}", e)))?;
        println!("{}", json);
    } else if !global.quiet || !summary.is_success() {
        println!("{}", summary.render_text());
    }
    Ok(())
}
