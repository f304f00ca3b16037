use crate::pipeline::RunReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Process,
    Recompute,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub submission_id: String,
    pub kind: JobKind,
}

impl Job {
    pub fn new(submission_id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            submission_id: submission_id.into(),
            kind,
        }
    }

    pub fn process(submission_id: impl Into<String>) -> Self {
        Self::new(submission_id, JobKind::Process)
    }

    pub fn recompute(submission_id: impl Into<String>) -> Self {
        Self::new(submission_id, JobKind::Recompute)
    }
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub submission_id: String,
    pub kind: JobKind,
    /// The run report, or the error that stopped the job before a run started.
    pub outcome: Result<RunReport, String>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(&self.outcome, Ok(report) if report.error.is_none())
    }
}
