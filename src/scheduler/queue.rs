use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Notify, RwLock};
use uuid::Uuid;

use crate::scheduler::job::{JobStatus, SortJob};

const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Published whenever a job enters the queue or its status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// Outcome of an enqueue attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    /// The job was appended at the back of the queue.
    Added(SortJob),
    /// A job with the same id was already queued; this is the stored one.
    Existing(SortJob),
}

impl Enqueued {
    pub fn job(&self) -> &SortJob {
        match self {
            Enqueued::Added(job) | Enqueued::Existing(job) => job,
        }
    }

    pub fn into_job(self) -> SortJob {
        match self {
            Enqueued::Added(job) | Enqueued::Existing(job) => job,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Enqueued::Added(_))
    }
}

/// Ordered, concurrency-safe store of job snapshots.
///
/// Producers append with [`JobQueue::enqueue`]; the worker uses the
/// front-of-queue primitives. At most one entry exists per job id.
#[derive(Debug)]
pub struct JobQueue {
    jobs: RwLock<VecDeque<SortJob>>,
    submitted: Notify,
    events: broadcast::Sender<JobEvent>,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            jobs: RwLock::new(VecDeque::new()),
            submitted: Notify::new(),
            events,
        }
    }

    /// Append `job` unless an entry with its id already exists.
    pub async fn try_enqueue(&self, job: SortJob) -> Enqueued {
        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.iter().find(|j| j.id == job.id) {
            tracing::debug!(job_id = %job.id, "Job already queued, ignoring submission");
            return Enqueued::Existing(existing.clone());
        }

        tracing::info!(job_id = %job.id, "Enqueueing job");
        jobs.push_back(job.clone());
        drop(jobs);

        self.publish(&job);
        self.submitted.notify_one();
        Enqueued::Added(job)
    }

    /// Idempotent by id. Always hands back the job passed in.
    pub async fn enqueue(&self, job: SortJob) -> SortJob {
        let returned = job.clone();
        self.try_enqueue(job).await;
        returned
    }

    /// Copy of every queued job, front to back.
    pub async fn list(&self) -> Vec<SortJob> {
        self.jobs.read().await.iter().cloned().collect()
    }

    pub async fn get(&self, id: &Uuid) -> Option<SortJob> {
        self.jobs.read().await.iter().find(|j| j.id == *id).cloned()
    }

    pub async fn peek(&self) -> Option<SortJob> {
        self.jobs.read().await.front().cloned()
    }

    pub async fn dequeue(&self) -> Option<SortJob> {
        self.jobs.write().await.pop_front()
    }

    /// Move the front job to the back. Returns the job that was moved.
    pub async fn rotate(&self) -> Option<SortJob> {
        let mut jobs = self.jobs.write().await;
        let front = jobs.pop_front()?;
        jobs.push_back(front.clone());
        Some(front)
    }

    pub async fn first_pending(&self) -> Option<SortJob> {
        self.jobs
            .read()
            .await
            .iter()
            .find(|j| j.status == JobStatus::Pending)
            .cloned()
    }

    pub async fn has_pending(&self) -> bool {
        self.jobs
            .read()
            .await
            .iter()
            .any(|j| j.status == JobStatus::Pending)
    }

    /// Replace the entry with the same id in place. Returns false if the job
    /// is no longer queued.
    pub async fn update(&self, job: SortJob) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(slot) = jobs.iter_mut().find(|j| j.id == job.id) else {
            return false;
        };
        *slot = job.clone();
        drop(jobs);

        self.publish(&job);
        true
    }

    /// Remove the current entry for `job.id` and append `job` at the back.
    pub async fn requeue_result(&self, job: SortJob) {
        let mut jobs = self.jobs.write().await;
        jobs.retain(|j| j.id != job.id);
        jobs.push_back(job.clone());
        drop(jobs);

        tracing::debug!(
            job_id = %job.id,
            status = %job.status,
            "Job re-queued with updated status"
        );
        self.publish(&job);
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Resolves after the next successful enqueue. A submission made while
    /// nobody is waiting is remembered for the next caller.
    pub async fn wait_for_submission(&self) {
        self.submitted.notified().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    fn publish(&self, job: &SortJob) {
        // No subscribers is not an error.
        let _ = self.events.send(JobEvent {
            job_id: job.id,
            status: job.status,
        });
    }
}
