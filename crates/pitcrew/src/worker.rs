//! Worker loop: pops jobs off the queue and runs them through the
//! orchestrator. Any number of workers may run against the same broker;
//! jobs are independent and share nothing but the baseline store.

use crate::hosting::HostingApi;
use crate::orchestrator::{BaselineRepo, Orchestrator, ScanEngine};
use pitcrew_store::JobQueue;
use std::time::Duration;
use tracing::{error, info};

/// How long one BRPOP blocks before the loop re-checks.
const DEQUEUE_TIMEOUT_SECS: usize = 30;

/// Backoff after a broker error so a dead broker doesn't spin the loop.
const BROKER_BACKOFF: Duration = Duration::from_secs(5);

pub struct Worker<H, B, S> {
    queue: JobQueue,
    orchestrator: Orchestrator<H, B, S>,
}

impl<H: HostingApi, B: BaselineRepo, S: ScanEngine> Worker<H, B, S> {
    pub fn new(queue: JobQueue, orchestrator: Orchestrator<H, B, S>) -> Self {
        Self {
            queue,
            orchestrator,
        }
    }

    /// Run until the process is stopped.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("scan worker started");
        loop {
            match self.queue.dequeue(DEQUEUE_TIMEOUT_SECS).await {
                Ok(Some(job)) => {
                    info!(
                        owner = %job.owner,
                        repo = %job.repo,
                        mode = %job.mode(),
                        "job started"
                    );
                    let outcome = self.orchestrator.run(&job).await;
                    info!(
                        owner = %job.owner,
                        repo = %job.repo,
                        status = %outcome.status,
                        mode = %outcome.mode,
                        new_issues = outcome.new_issues_found,
                        "job finished"
                    );
                }
                Ok(None) => continue,
                Err(err) => {
                    error!(%err, "queue error, backing off");
                    tokio::time::sleep(BROKER_BACKOFF).await;
                }
            }
        }
    }
}
