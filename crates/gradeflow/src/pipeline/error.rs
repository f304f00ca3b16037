use thiserror::Error;

use crate::error::{DetectionError, ExtractionError, PersistenceError, ScoringError};
use crate::model::ProcessingStatus;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Submission '{0}' not found")]
    NotFound(String),

    #[error("Submission '{0}' has no uploaded document")]
    MissingDocument(String),

    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Correctness scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Plagiarism detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Submission '{id}' is {status}; only completed submissions can be recomputed")]
    NotCompleted { id: String, status: ProcessingStatus },
}
