//! Persistence seams consumed by the pipeline, plus the SQLite implementation.

pub mod database;
pub mod migrations;

pub use database::Database;

use crate::error::PersistenceError;
use crate::model::{
    Assignment, PlagiarismVerdict, ProcessingStatus, Submission, SubmissionText,
};

/// A single-column write that does not need the rest of the record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Sets the status and clears `processing_error`.
    Status(ProcessingStatus),
    /// Marks the submission `Failed` with the given message.
    Failed(String),
    PlagiarismResult(PlagiarismVerdict),
    FinalScore(Option<f64>),
}

pub trait SubmissionStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Submission>, PersistenceError>;

    /// The uploaded document bytes, if any.
    fn load_document(&self, id: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Overwrites the fields a pipeline run produces. `plagiarism_severity`
    /// belongs to the grader and is left as stored.
    fn save(&self, submission: &Submission) -> Result<(), PersistenceError>;

    fn set_field(&self, id: &str, update: FieldUpdate) -> Result<(), PersistenceError>;

    /// Submissions of `assignment_id` with non-empty extracted text, excluding
    /// `exclude_id`, oldest first.
    fn cohort(
        &self,
        assignment_id: &str,
        exclude_id: &str,
    ) -> Result<Vec<SubmissionText>, PersistenceError>;
}

pub trait AssignmentStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Assignment>, PersistenceError>;
}
