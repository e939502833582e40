use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::scheduler::SortJob;

/// Something the worker can hand a job to. Returns the updated job, or an
/// error if the job could not be processed.
pub trait JobRunner: Send + Sync + 'static {
    fn run(&self, job: SortJob) -> impl Future<Output = Result<SortJob>> + Send;
}

/// Sorts ascending by natural ordering.
pub fn sort_values(values: &[i64]) -> Vec<i64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted
}

/// Performs the "expensive" sort.
///
/// The sort itself is cheap; a fixed delay is awaited afterwards to emulate
/// real cost. The reported duration covers both.
#[derive(Debug, Clone)]
pub struct SortExecutor {
    delay: Duration,
}

impl SortExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Produce a completed copy of `job`. Never fails.
    pub async fn execute(&self, job: &SortJob) -> SortJob {
        tracing::info!(job_id = %job.id, len = job.input.len(), "Processing job");

        let started = Instant::now();
        let output = sort_values(&job.input);
        tokio::time::sleep(self.delay).await;
        let duration = started.elapsed();

        tracing::info!(job_id = %job.id, duration = ?duration, "Completed processing job");

        job.completed(output, duration)
    }
}

impl JobRunner for SortExecutor {
    fn run(&self, job: SortJob) -> impl Future<Output = Result<SortJob>> + Send {
        async move { Ok(self.execute(&job).await) }
    }
}
