use crate::Result;
use pitcrew_core::ScanJob;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

/// List key the intake pushes to and workers pop from.
const QUEUE_KEY: &str = "pitcrew:jobs";

/// JSON job queue over a broker list.
///
/// The intake LPUSHes serialized jobs; any number of workers BRPOP them.
/// Delivery and recovery guarantees are whatever the broker provides.
#[derive(Clone)]
pub struct JobQueue {
    con: ConnectionManager,
}

impl JobQueue {
    /// Connect to the broker at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let con = ConnectionManager::new(client).await?;
        Ok(Self::new(con))
    }

    /// Wrap an existing managed connection.
    pub fn new(con: ConnectionManager) -> Self {
        Self { con }
    }

    /// Push a job onto the queue.
    pub async fn enqueue(&self, job: &ScanJob) -> Result<()> {
        let payload = serde_json::to_string(job)?;
        let mut con = self.con.clone();
        con.lpush::<_, _, ()>(QUEUE_KEY, payload).await?;
        debug!(owner = %job.owner, repo = %job.repo, mode = %job.mode(), "enqueued job");
        Ok(())
    }

    /// Block up to `timeout_secs` for the next job; `None` on timeout.
    pub async fn dequeue(&self, timeout_secs: usize) -> Result<Option<ScanJob>> {
        let mut con = self.con.clone();
        let popped: Option<(String, String)> = con.brpop(QUEUE_KEY, timeout_secs as f64).await?;
        match popped {
            Some((_, payload)) => {
                let job: ScanJob = serde_json::from_str(&payload)?;
                debug!(owner = %job.owner, repo = %job.repo, "dequeued job");
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }
}
