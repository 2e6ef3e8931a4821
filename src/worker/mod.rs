pub mod payee;
pub mod priceoracle;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A periodically ticking worker.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;
    async fn on_tick(&self) -> Result<()>;
}

/// Drives a `Job` until cancelled: `delay` between successful ticks,
/// `err_delay` after failed ones. Errors are logged and retried, never
/// fatal; the tick that failed left no partial state behind (handlers run
/// in store transactions).
pub struct TickWorker {
    pub delay: Duration,
    pub err_delay: Duration,
}

impl TickWorker {
    pub async fn run(self, job: Arc<dyn Job>, token: CancellationToken) {
        info!(worker = job.name(), "worker started");
        loop {
            if token.is_cancelled() {
                break;
            }
            let wait = match job.on_tick().await {
                Ok(()) => self.delay,
                Err(err) => {
                    warn!(worker = job.name(), error = %err, "tick failed");
                    self.err_delay
                }
            };
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        info!(worker = job.name(), "worker stopped");
    }
}
