use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradeflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Rasterization or OCR failure. Fatal for a pipeline run.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to stage document in temporary storage: {0}")]
    TempStorage(#[source] std::io::Error),

    #[error("Failed to rasterize document: {0}")]
    Rasterize(String),

    #[error("Document has no pages")]
    NoPages,

    #[error("OCR failed on page {page}: {reason}")]
    Ocr { page: usize, reason: String },
}

/// Embedding or encoding failure. Fatal for a pipeline run.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Batch size mismatch: {candidates} candidates vs {references} references")]
    BatchMismatch {
        candidates: usize,
        references: usize,
    },
}

/// Vector-space or hashing failure during plagiarism detection.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Empty vocabulary; the documents may only contain stop words")]
    EmptyVocabulary,

    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(String),
}

/// Store unavailable or a read/write against it failed.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Corrupt value in column '{column}': {reason}")]
    CorruptValue { column: &'static str, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Job queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },
}

pub type Result<T> = std::result::Result<T, GradeflowError>;
