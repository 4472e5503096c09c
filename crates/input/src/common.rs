//! Shared delivery loop
//!
//! One message, delivered at least once: send downstream, await the
//! response, re-send the same message behind the throttle on rejection.

use tokio::sync::mpsc;
use tracing::warn;

use weir_core::{ShutdownSignal, Throttle};
use weir_message::{Message, Response, Transaction};

/// Deliver `msg` until it is acknowledged.
///
/// Returns `false` when delivery was abandoned: the downstream channel is
/// gone or shutdown fired. The caller stops producing in either case.
pub(crate) async fn deliver(
    out_tx: &mpsc::Sender<Transaction>,
    shutdown: &ShutdownSignal,
    throttle: &mut Throttle,
    msg: Message,
) -> bool {
    loop {
        let (transaction, response_rx) = Transaction::channel(msg.shallow_copy());
        tokio::select! {
            sent = out_tx.send(transaction) => {
                if sent.is_err() {
                    return false;
                }
            }
            _ = shutdown.cancelled() => return false,
        }

        let response = tokio::select! {
            r = response_rx => r,
            _ = shutdown.cancelled() => return false,
        };
        match response {
            Ok(Response::Ack) => {
                throttle.reset();
                return true;
            }
            Ok(Response::Nack(err)) => {
                warn!(error = %err, "message rejected downstream, retrying");
                if !throttle.retry().await {
                    return false;
                }
            }
            Err(_) => {
                if !throttle.retry().await {
                    return false;
                }
            }
        }
    }
}
