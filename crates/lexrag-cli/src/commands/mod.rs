//! Subcommand implementations.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod sessions;
pub mod stats;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels `token` on the first Ctrl-C; abort the handle once the work is done.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling the query");
            token.cancel();
        }
    })
}
