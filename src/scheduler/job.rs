use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs are never picked up again as new work.
    pub fn is_settled(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A snapshot of one sort job. The queue never mutates a job field by field;
/// every status change replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub input: Vec<i64>,
    pub output: Option<Vec<i64>>,
    pub duration: Option<Duration>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SortJob {
    pub fn new(input: Vec<i64>) -> Self {
        Self::with_id(Uuid::new_v4(), input)
    }

    pub fn with_id(id: Uuid, input: Vec<i64>) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            input,
            output: None,
            duration: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Same job, new status. Result fields are left as they were.
    pub fn with_status(&self, status: JobStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub fn completed(&self, output: Vec<i64>, duration: Duration) -> Self {
        Self {
            status: JobStatus::Completed,
            output: Some(output),
            duration: Some(duration),
            error: None,
            completed_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    pub fn failed(&self, reason: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            output: None,
            duration: None,
            error: Some(reason.into()),
            completed_at: Some(Utc::now()),
            ..self.clone()
        }
    }
}
