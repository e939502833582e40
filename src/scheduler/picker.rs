use std::str::FromStr;

use crate::scheduler::job::JobStatus;
use crate::scheduler::{JobQueue, SortJob};

/// Decides which job the worker runs next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickPolicy {
    /// Look at the front job. A settled front job is rotated to the back;
    /// a rotated completed job is still handed out and re-sorted.
    #[default]
    Rotate,
    /// First pending job in queue order. Nothing is moved.
    PendingFifo,
}

impl PickPolicy {
    pub async fn pick_next(self, queue: &JobQueue) -> Option<SortJob> {
        match self {
            PickPolicy::Rotate => {
                let front = queue.peek().await?;
                if front.status.is_settled() {
                    tracing::debug!(
                        job_id = %front.id,
                        status = %front.status,
                        "Rotating settled job to the back"
                    );
                    queue.rotate().await;
                    if front.status == JobStatus::Failed {
                        return None;
                    }
                }
                Some(front)
            }
            PickPolicy::PendingFifo => queue.first_pending().await,
        }
    }
}

impl std::fmt::Display for PickPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickPolicy::Rotate => write!(f, "rotate"),
            PickPolicy::PendingFifo => write!(f, "pending-fifo"),
        }
    }
}

impl FromStr for PickPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rotate" => Ok(PickPolicy::Rotate),
            "pending-fifo" => Ok(PickPolicy::PendingFifo),
            other => Err(format!(
                "unknown pick policy '{}', expected 'rotate' or 'pending-fifo'",
                other
            )),
        }
    }
}
