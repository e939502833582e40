//! Background worker that drains the job queue.
//!
//! A single [`QueueWorker`] runs for the lifetime of the service:
//! - **Idle**: the queue is empty, sleep for the idle backoff and re-scan
//! - **Scanning**: jobs are queued; if none is pending, wait for the next
//!   submission, otherwise ask the
//!   [`PickPolicy`](crate::scheduler::PickPolicy) for the next job
//! - **Executing**: the picked job runs on the [`JobRunner`] in its own task
//!
//! A failing or panicking job is logged and re-queued as failed. It never
//! stops the loop. The loop exits when its cancellation token fires, after
//! any job that is already executing has finished.

pub mod executor;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::scheduler::{JobQueue, JobStatus, SortJob};

pub use executor::{sort_values, JobRunner, SortExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Scanning,
    Executing,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Scanning => write!(f, "scanning"),
            WorkerState::Executing => write!(f, "executing"),
        }
    }
}

pub struct QueueWorker<R: JobRunner = SortExecutor> {
    queue: Arc<JobQueue>,
    runner: Arc<R>,
    config: WorkerConfig,
    state: watch::Sender<WorkerState>,
}

impl QueueWorker<SortExecutor> {
    pub fn new(queue: Arc<JobQueue>, config: WorkerConfig) -> Self {
        let executor = SortExecutor::new(config.sort_delay);
        Self::with_runner(queue, executor, config)
    }
}

impl<R: JobRunner> QueueWorker<R> {
    pub fn with_runner(queue: Arc<JobQueue>, runner: R, config: WorkerConfig) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            queue,
            runner: Arc::new(runner),
            config,
            state,
        }
    }

    /// Observe state transitions of this worker.
    pub fn state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            policy = %self.config.pick_policy,
            idle_backoff = ?self.config.idle_backoff,
            "Queue worker started"
        );

        while !shutdown.is_cancelled() {
            self.step(&shutdown).await;
        }

        self.state.send_replace(WorkerState::Idle);
        tracing::info!("Queue worker stopped");
    }

    /// One pass of the worker loop.
    pub async fn step(&self, shutdown: &CancellationToken) {
        if self.queue.is_empty().await {
            self.state.send_replace(WorkerState::Idle);
            tracing::trace!("Waiting for jobs in the queue");
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(self.config.idle_backoff) => {}
            }
            return;
        }

        self.state.send_replace(WorkerState::Scanning);
        if !self.queue.has_pending().await {
            // Only a submission can create pending work, so re-scan on the
            // next one instead of spinning.
            tracing::trace!("No pending jobs in the queue");
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = self.queue.wait_for_submission() => {}
            }
            return;
        }

        if let Some(picked) = self.config.pick_policy.pick_next(&self.queue).await {
            self.execute(picked).await;
        }
    }

    async fn execute(&self, picked: SortJob) {
        let picked_status = picked.status;
        if picked_status == JobStatus::Pending {
            self.queue
                .update(picked.with_status(JobStatus::Processing))
                .await;
        }

        self.state.send_replace(WorkerState::Executing);

        let runner = self.runner.clone();
        let input = picked.clone();
        let outcome = tokio::spawn(async move { runner.run(input).await }).await;

        let result = match outcome {
            Ok(Ok(job)) => job,
            Ok(Err(e)) => {
                tracing::error!(job_id = %picked.id, error = %e, "Job execution failed");
                self.failed(&picked, e.to_string())
            }
            Err(e) => {
                let reason = panic_reason(e);
                tracing::error!(job_id = %picked.id, error = %reason, "Job execution panicked");
                self.failed(&picked, reason)
            }
        };

        self.state.send_replace(WorkerState::Scanning);

        if result.status != picked_status {
            self.queue.requeue_result(result).await;
        }
    }

    /// A failed re-run of an already completed job keeps the completed entry.
    fn failed(&self, picked: &SortJob, reason: String) -> SortJob {
        if picked.status == JobStatus::Completed {
            picked.clone()
        } else {
            picked.failed(reason)
        }
    }
}

fn panic_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }

    let payload = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "job panicked".to_string())
}
