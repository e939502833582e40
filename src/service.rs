use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::{Result, SortError};
use crate::scheduler::{Enqueued, JobEvent, JobQueue, SortJob};
use crate::worker::{JobRunner, QueueWorker, SortExecutor, WorkerState};

/// Owns the job queue and its background worker.
///
/// Everything a request handler needs goes through here: submitting jobs,
/// reading them back, sorting synchronously, and awaiting completion.
pub struct SortService {
    queue: Arc<JobQueue>,
    executor: SortExecutor,
    worker_state: watch::Receiver<WorkerState>,
    shutdown: CancellationToken,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SortService {
    /// Create the queue and spawn the worker. Cancelling `shutdown` (or
    /// calling [`SortService::shutdown`]) stops the worker.
    pub fn start(config: &ServiceConfig, shutdown: CancellationToken) -> Self {
        let executor = SortExecutor::new(config.worker.sort_delay);
        Self::start_with_runner(config, executor, shutdown)
    }

    /// Like [`SortService::start`], but the worker hands jobs to `runner`.
    pub fn start_with_runner<R: JobRunner>(
        config: &ServiceConfig,
        runner: R,
        shutdown: CancellationToken,
    ) -> Self {
        let queue = Arc::new(JobQueue::with_event_capacity(config.event_capacity));
        let worker = QueueWorker::with_runner(queue.clone(), runner, config.worker.clone());
        let worker_state = worker.state();

        let token = shutdown.child_token();
        let worker_token = token.clone();
        let handle = tokio::spawn(async move {
            worker.run(worker_token).await;
        });

        Self {
            queue,
            executor: SortExecutor::new(config.worker.sort_delay),
            worker_state,
            shutdown: token,
            worker_handle: Mutex::new(Some(handle)),
        }
    }

    /// Queue a job unless one with the same id exists. Either way the stored
    /// job is returned.
    pub async fn submit(&self, job: SortJob) -> Result<Enqueued> {
        if self.shutdown.is_cancelled() {
            return Err(SortError::ShuttingDown);
        }
        Ok(self.queue.try_enqueue(job).await)
    }

    pub async fn list_jobs(&self) -> Vec<SortJob> {
        self.queue.list().await
    }

    pub async fn get_job(&self, id: &Uuid) -> Result<SortJob> {
        self.queue
            .get(id)
            .await
            .ok_or(SortError::JobNotFound(*id))
    }

    /// Sort `job` right away, bypassing the queue.
    pub async fn run_once(&self, job: SortJob) -> Result<SortJob> {
        self.executor.run(job).await
    }

    /// Wait until the job is completed or failed.
    pub async fn wait_for(&self, id: Uuid, timeout: Duration) -> Result<SortJob> {
        let events = self.queue.subscribe();

        tokio::time::timeout(timeout, self.wait_settled(id, events))
            .await
            .map_err(|_| SortError::Timeout(id))?
    }

    async fn wait_settled(
        &self,
        id: Uuid,
        mut events: broadcast::Receiver<JobEvent>,
    ) -> Result<SortJob> {
        loop {
            let job = self.get_job(&id).await?;
            if job.status.is_settled() {
                return Ok(job);
            }

            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Err(SortError::ShuttingDown),
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.queue.subscribe()
    }

    pub fn worker_state(&self) -> WorkerState {
        *self.worker_state.borrow()
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    /// Stop the worker and wait for it to exit. A job that is executing is
    /// finished first.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handle = self.worker_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Queue worker task ended abnormally");
            }
        }
    }
}

impl Drop for SortService {
    fn drop(&mut self) {
        // The worker must not outlive the service that owns its queue.
        self.shutdown.cancel();
    }
}
