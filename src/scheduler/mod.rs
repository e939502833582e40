pub mod job;
pub mod picker;
pub mod queue;

pub use job::{JobStatus, SortJob};
pub use picker::PickPolicy;
pub use queue::{Enqueued, JobEvent, JobQueue};
