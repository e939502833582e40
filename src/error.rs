use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SortError {
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Sorting job {job_id} failed: {reason}")]
    ExecutionFailed { job_id: Uuid, reason: String },

    #[error("Timed out waiting for job {0}")]
    Timeout(Uuid),

    #[error("Service is shutting down")]
    ShuttingDown,
}

pub type Result<T> = std::result::Result<T, SortError>;
