pub mod config;
pub mod detection;
pub mod error;
pub mod extract;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod plagiarism;
pub mod scoring;
pub mod store;
pub mod worker;

pub use config::{load_config, Config};
pub use error::{
    ConfigError, DetectionError, ExtractionError, GradeflowError, PersistenceError, Result,
    ScoringError, WorkerError,
};
pub use model::{
    Assignment, CorrectnessLabel, PlagiarismVerdict, ProcessingStatus, Severity, Submission,
};
pub use pipeline::{Pipeline, PipelineError, RunReport};
pub use store::{AssignmentStore, Database, FieldUpdate, SubmissionStore};
pub use worker::{Trigger, WorkerPool};
