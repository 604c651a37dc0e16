use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use shared::types::{Job, ResolvedRecord};
use crate::queue::JobQueue;
use crate::store_manager::StoreHandle;
use crate::webhook::Notifier;
use crate::whois::resolver::Resolver;

/// The per-job stages: resolve, store, notify. Run strictly in sequence.
#[derive(Clone)]
pub struct Pipeline {
    resolver: Arc<dyn Resolver>,
    store: StoreHandle,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(resolver: Arc<dyn Resolver>, store: StoreHandle, notifier: Notifier) -> Self {
        Self { resolver, store, notifier }
    }

    /// Process one job to completion and return the id its result was
    /// stored under. Resolver and webhook failures do not fail the job.
    pub async fn process(&self, job: Job) -> Result<String> {
        let resolution = self.resolver.resolve(&job).await;
        if let Some(e) = &resolution.error {
            tracing::warn!("Job [{}] completed with resolver error: {}", job.id, e);
        }

        let record = ResolvedRecord {
            uuid: job.id.clone(),
            query: resolution.query,
            is_host_lookup: resolution.is_host_lookup,
            result: resolution.payload,
            resolved_at: Utc::now(),
        };

        let result_id = self.fresh_result_id(&job.id).await?;
        self.store.put(result_id.clone(), record).await?;

        self.notifier.notify(&result_id).await;

        Ok(result_id)
    }

    /// New result id, never equal to the job id or to a stored result's id
    async fn fresh_result_id(&self, job_id: &str) -> Result<String> {
        loop {
            let id = Uuid::new_v4().to_string();
            if id != job_id && !self.store.contains(id.clone()).await? {
                return Ok(id);
            }
        }
    }
}

/// Drain loop: every `interval`, pop at most one job and process it. The
/// next wait starts only once the current job is done, so at most one job is
/// in flight. Cancellation is observed between jobs.
pub async fn run(
    queue: JobQueue,
    pipeline: Pipeline,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    tracing::info!("Drain loop started, interval {:?}", interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => {
                if !queue.is_empty() {
                    tracing::warn!("Dropping {} queued jobs", queue.len());
                }
                tracing::info!("Drain loop shutting down");
                break;
            }
        }

        let Some(job) = queue.try_dequeue() else {
            continue;
        };

        let job_id = job.id.clone();
        match pipeline.process(job).await {
            Ok(result_id) => tracing::info!("Job [{}] resolved as {}", job_id, result_id),
            Err(e) => tracing::error!("Failed to store result for job [{}]: {}", job_id, e),
        }
    }

    Ok(())
}
