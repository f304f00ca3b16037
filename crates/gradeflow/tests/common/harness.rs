//! Test harness for isolated pipeline execution.
//!
//! The `TestHarness` owns an in-memory database and a `Pipeline` wired to
//! stub collaborators, so a scenario only has to seed rows and run ids.

#![allow(dead_code)]

use std::sync::Arc;

use gradeflow::config::PenaltyConfig;
use gradeflow::detection::ExactCopyDetector;
use gradeflow::extract::TextExtractor;
use gradeflow::model::{Assignment, Submission};
use gradeflow::plagiarism::PlagiarismChecker;
use gradeflow::scoring::{CorrectnessScorer, HashingEmbedder, SentenceEmbedder};
use gradeflow::store::{Database, SubmissionStore};
use gradeflow::{Pipeline, RunReport};

use super::builders::{PlainTextExtractor, SubmissionBuilder};

/// Test harness providing an isolated database and pipeline.
pub struct TestHarness {
    pub db: Database,
    pub pipeline: Arc<Pipeline>,
}

impl TestHarness {
    /// Harness with the hashing embedder and default penalties.
    pub fn new() -> Self {
        Self::with_embedder(Arc::new(HashingEmbedder::new(256)))
    }

    /// Harness with a custom embedder.
    pub fn with_embedder(embedder: Arc<dyn SentenceEmbedder>) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let submissions: Arc<dyn SubmissionStore> = Arc::new(db.clone());
        Self::build(db, submissions, embedder, Arc::new(PlainTextExtractor))
    }

    /// Harness with a custom extractor.
    pub fn with_extractor(extractor: Arc<dyn TextExtractor>) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let submissions: Arc<dyn SubmissionStore> = Arc::new(db.clone());
        Self::build(db, submissions, Arc::new(HashingEmbedder::new(256)), extractor)
    }

    /// Harness whose pipeline writes submissions through `submissions`.
    pub fn with_store(db: Database, submissions: Arc<dyn SubmissionStore>) -> Self {
        Self::build(
            db,
            submissions,
            Arc::new(HashingEmbedder::new(256)),
            Arc::new(PlainTextExtractor),
        )
    }

    fn build(
        db: Database,
        submissions: Arc<dyn SubmissionStore>,
        embedder: Arc<dyn SentenceEmbedder>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let detector = ExactCopyDetector::new(128, 0.5).expect("Failed to build detector");
        let pipeline = Pipeline::new(
            submissions,
            Arc::new(db.clone()),
            extractor,
            CorrectnessScorer::new(embedder),
            PlagiarismChecker::new(detector),
            PenaltyConfig::default(),
        );
        Self {
            db,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn add_assignment(&self, assignment: Assignment) -> &Self {
        self.db
            .insert_assignment(&assignment)
            .expect("Failed to insert assignment");
        self
    }

    pub fn add_submission(&self, builder: SubmissionBuilder) -> &Self {
        let (submission, document) = builder.build();
        self.db
            .insert_submission(&submission, &document)
            .expect("Failed to insert submission");
        self
    }

    /// Runs the pipeline and panics if it returns `Err`.
    pub fn run(&self, id: &str) -> RunReport {
        self.pipeline
            .run(id)
            .unwrap_or_else(|e| panic!("Pipeline run for '{}' failed: {}", id, e))
    }

    /// Reads the stored submission, panicking if it is absent.
    pub fn submission(&self, id: &str) -> Submission {
        SubmissionStore::get(&self.db, id)
            .expect("Failed to read submission")
            .unwrap_or_else(|| panic!("Submission '{}' not stored", id))
    }
}
