use std::sync::Arc;

use attache_core::DispatchData;
use attache_lambda::LambdaPlugin;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub id: Uuid,
    pub data: DispatchData,
}

/// Background dispatch of cached attachments to their processing function.
///
/// Uploads return as soon as the job is queued; a bounded worker pool performs
/// the assembly build, persistence and invocation.
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::Sender<DispatchJob>,
}

impl DispatchQueue {
    /// Create a new dispatch queue with bounded channel
    ///
    /// # Arguments
    /// * `plugin` - Configured Lambda plugin
    /// * `queue_size` - Channel bound; `submit()` fails once this many jobs are waiting
    /// * `max_concurrent` - Maximum number of dispatches in flight
    pub fn new(plugin: LambdaPlugin, queue_size: usize, max_concurrent: usize) -> Self {
        let queue_size = queue_size.max(1);
        let (tx, rx) = mpsc::channel(queue_size);

        tokio::spawn(async move {
            Self::worker_pool(rx, plugin, max_concurrent.max(1)).await;
        });

        tracing::info!(
            queue_size = queue_size,
            max_concurrent = max_concurrent,
            "Dispatch queue initialized with bounded channel"
        );

        Self { tx }
    }

    #[tracing::instrument(skip(self, data), fields(record = %data.record, attachment = %data.name))]
    pub fn submit(&self, data: DispatchData) -> Result<Uuid, ApiError> {
        let job = DispatchJob {
            id: Uuid::new_v4(),
            data,
        };
        let id = job.id;
        tracing::info!(job_id = %id, "Enqueuing dispatch job");

        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!("Dispatch queue is full, rejecting job");
                ApiError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => ApiError::QueueClosed,
        })?;
        Ok(id)
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<DispatchJob>,
        plugin: LambdaPlugin,
        max_concurrent: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        while let Some(job) = rx.recv().await {
            let permit = semaphore.clone().acquire_owned().await;
            let plugin = plugin.clone();

            tokio::spawn(async move {
                let _permit = permit;
                Self::process_job(job, plugin).await;
            });
        }

        tracing::info!("Dispatch queue closed");
    }

    #[tracing::instrument(skip(job, plugin), fields(job.id = %job.id, job.status = tracing::field::Empty))]
    async fn process_job(job: DispatchJob, plugin: LambdaPlugin) {
        let start = std::time::Instant::now();

        match plugin.dispatch(&job.data).await {
            Ok(_) => {
                tracing::Span::current().record("job.status", "success");
                tracing::info!(
                    duration_ms = elapsed_ms(start),
                    "Dispatch completed successfully"
                );
            }
            Err(e) => {
                tracing::Span::current().record("job.status", "failed");
                tracing::error!(
                    error = %e,
                    duration_ms = elapsed_ms(start),
                    "Dispatch failed"
                );
            }
        }
    }
}

fn elapsed_ms(start: std::time::Instant) -> u128 {
    start.elapsed().as_millis()
}
