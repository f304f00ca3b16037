//! Per-submission processing: extract, score, check plagiarism, penalize, persist.

pub mod error;
pub mod penalty;
pub mod runner;

pub use error::PipelineError;
pub use penalty::final_score;
pub use runner::{Pipeline, RunReport};
