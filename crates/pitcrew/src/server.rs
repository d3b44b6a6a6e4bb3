//! Webhook server wiring: connects the intake endpoint to the job queue.

use crate::settings::Settings;
use pitcrew_core::ScanJob;
use pitcrew_github::{webhook_router, JobSink, WebhookState};
use pitcrew_store::JobQueue;
use std::sync::Arc;
use tracing::info;

/// Adapts the Redis queue to the intake's sink capability.
pub struct QueueSink {
    queue: JobQueue,
}

impl QueueSink {
    pub fn new(queue: JobQueue) -> Self {
        Self { queue }
    }
}

#[async_trait::async_trait]
impl JobSink for QueueSink {
    async fn enqueue(&self, job: ScanJob) -> anyhow::Result<()> {
        self.queue.enqueue(&job).await?;
        Ok(())
    }
}

/// Bind the webhook endpoint and serve until stopped.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let queue = JobQueue::connect(&settings.redis_url).await?;
    let state = Arc::new(WebhookState::new(
        settings.webhook_secret.clone(),
        Arc::new(QueueSink::new(queue)),
    ));

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!(addr = %settings.bind, "webhook server listening");
    axum::serve(listener, webhook_router(state)).await?;
    Ok(())
}
