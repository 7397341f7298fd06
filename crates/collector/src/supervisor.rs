use std::future::Future;
use std::sync::Arc;

use chrono::{Local, Utc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use vossibility_core::PeriodicSync;
use vossibility_queue::QueueError;
use vossibility_store::Repository;

use crate::error::CollectorError;
use crate::pause::PauseGate;
use crate::sync::{SyncJob, SyncReport};

/// Control loop of the `run` command.
///
/// Owns the live consumers and fires the periodic sync at every boundary
/// of the sync periodicity, with live processing paused for its duration.
pub struct Supervisor {
    gate: PauseGate,
    periodicity: PeriodicSync,
    sync: SyncJob,
    repositories: Vec<Arc<Repository>>,
    cancel: CancellationToken,
    consumers: JoinSet<Result<(), QueueError>>,
}

impl Supervisor {
    pub fn new(
        gate: PauseGate,
        periodicity: PeriodicSync,
        sync: SyncJob,
        repositories: Vec<Arc<Repository>>,
    ) -> Self {
        Self {
            gate,
            periodicity,
            sync,
            repositories,
            cancel: CancellationToken::new(),
            consumers: JoinSet::new(),
        }
    }

    /// Token cancelled when shutdown is requested. Consumers must stop once
    /// it fires.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start a consumer under supervision.
    pub fn spawn_consumer<F>(&mut self, consumer: F)
    where
        F: Future<Output = Result<(), QueueError>> + Send + 'static,
    {
        self.consumers.spawn(consumer);
    }

    /// Run until every consumer has stopped. `shutdown` resolving cancels
    /// the consumers. A consumer failing outside shutdown stops the others
    /// too, and its error is returned once they have exited.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<(), CollectorError> {
        tokio::pin!(shutdown);
        let mut stopping = false;
        let mut failure = None;

        loop {
            let tick = self.periodicity.next_tick(Utc::now());
            if !stopping {
                let at = Local::now() + tick;
                info!(in_secs = tick.as_secs(), at = %at.format("%b %-d, %Y at %H:%M:%S"), "next sync scheduled");
            }

            tokio::select! {
                () = &mut shutdown, if !stopping => {
                    info!("shutdown requested, stopping consumers");
                    self.cancel.cancel();
                    stopping = true;
                }
                joined = self.consumers.join_next() => {
                    let error = match joined {
                        None => {
                            debug!("all consumers exited");
                            break;
                        }
                        Some(Ok(Ok(()))) => {
                            debug!("consumer exited");
                            continue;
                        }
                        Some(Ok(Err(e))) => CollectorError::Queue(e),
                        Some(Err(e)) => CollectorError::ConsumerAborted(e.to_string()),
                    };
                    error!(error = %error, "consumer failed");
                    if !stopping {
                        info!("stopping remaining consumers");
                        self.cancel.cancel();
                        stopping = true;
                    }
                    failure.get_or_insert(error);
                }
                () = tokio::time::sleep(tick), if !stopping => {
                    let report = self.periodic_sync().await;
                    info!(stored = report.stored(), complete = report.is_complete(), "periodic sync done");
                }
            }
        }

        failure.map_or(Ok(()), Err)
    }

    /// Run one sync with live processing paused.
    pub async fn periodic_sync(&self) -> SyncReport {
        let _guard = self.gate.exclusive().await;
        info!(repositories = self.repositories.len(), "starting periodic sync");
        self.sync.run(&self.repositories).await
    }
}
