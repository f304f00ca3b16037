pub mod job;
pub mod pool;

pub use job::{Job, JobKind, JobResult};
pub use pool::WorkerPool;

use crate::error::WorkerError;

/// Hands submissions to the pipeline. One accepted call means one run.
pub trait Trigger {
    /// Full pipeline run after a submission is created or its document replaced.
    fn submit_for_processing(&self, submission_id: &str) -> Result<(), WorkerError>;

    /// Final-score recompute after a severity change.
    fn submit_recompute(&self, submission_id: &str) -> Result<(), WorkerError>;
}
