use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::orchestrator::ScanOrchestrator;

/// A pool of independent workers pulling queued jobs. Each job is
/// processed end-to-end by a single worker; the job's version CAS
/// arbitrates claim races, so workers can safely read the same queued
/// row.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn spawn(
        orchestrator: Arc<ScanOrchestrator>,
        workers: usize,
        poll_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handles = (0..workers)
            .map(|worker_id| {
                let orchestrator = orchestrator.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    run_worker(worker_id, orchestrator, cancel, poll_interval).await;
                })
            })
            .collect();
        info!(workers, "Worker pool started");
        Self { handles, cancel }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                error!(error = %e, "Worker task panicked");
            }
        }
        info!("Worker pool stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    orchestrator: Arc<ScanOrchestrator>,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    debug!(worker_id, "Worker started");
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let job = match orchestrator.db().next_queued_job() {
            Ok(Some(job)) => job,
            Ok(None) => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => continue,
                }
            }
            Err(e) => {
                error!(worker_id, error = %e, "Failed to poll queue");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => continue,
                }
            }
        };

        if let Err(e) = orchestrator.process(&job).await {
            error!(worker_id, job_id = %job.id, error = %e, "Job processing error");
        }
    }
    debug!(worker_id, "Worker stopped");
}
