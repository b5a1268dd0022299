//! OS signal handling.
//!
//! # Responsibilities
//! - Translate Ctrl-C into cancellation of in-flight work
//!
//! # Design Decisions
//! - Only the token is cancelled; the engine drops in-flight attempts at its checkpoints
//! - A failure to install the handler is logged, not fatal

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    tracing::info!("Received Ctrl-C, cancelling");
                    token.cancel();
                }
                Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
            },
            _ = token.cancelled() => {}
        }
    })
}
