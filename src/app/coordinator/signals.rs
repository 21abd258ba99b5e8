//! Signal handling for graceful cancellation
//!
//! CTRL-C or SIGTERM cancels the run token. The producer stops enqueueing,
//! in-flight requests finish, and queued tasks are reported as cancelled.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels a run token when the process is asked to stop
pub struct SignalHandler {
    cancel: CancellationToken,
}

impl SignalHandler {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Spawn the background task that watches for signals
    ///
    /// The task also exits quietly if the token is cancelled elsewhere.
    pub fn setup(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, cancelling remaining transfers");
                },
                _ = terminate => {
                    info!("Received terminate signal, cancelling remaining transfers");
                },
                _ = cancel.cancelled() => return,
            }

            cancel.cancel();
        })
    }
}
