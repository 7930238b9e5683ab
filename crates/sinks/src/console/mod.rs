//! Stdout dump sink.
//!
//! Drains the incoming queue and prints every record, one per line. Used by
//! the `--console-out` debug mode in place of the real egress path.

use crossfire::MAsyncRx;
use polymur_protocol::Batch;
use tokio_util::sync::CancellationToken;

/// A sink that prints records to stdout.
pub struct ConsoleSink {
    receiver: MAsyncRx<Batch>,
}

impl ConsoleSink {
    /// Create a console sink over the incoming queue.
    pub fn new(receiver: MAsyncRx<Batch>) -> Self {
        Self { receiver }
    }

    /// Print batches until cancellation or channel close.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!("console output started");

        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.receiver.recv() => match received {
                    Ok(batch) => batch,
                    Err(_) => break,
                },
            };

            for record in batch.records() {
                println!("{record}");
            }
        }
    }
}
