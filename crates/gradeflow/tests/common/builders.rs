//! Builders and stub collaborators for creating test data programmatically.

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, Sender};
use gradeflow::error::{ExtractionError, PersistenceError, ScoringError};
use gradeflow::extract::TextExtractor;
use gradeflow::model::{Assignment, Severity, Submission, SubmissionText};
use gradeflow::scoring::SentenceEmbedder;
use gradeflow::store::{Database, FieldUpdate, SubmissionStore};

/// Documents starting with this marker fail extraction.
pub const CORRUPT_MARKER: &str = "%CORRUPT";

/// Treats document bytes as already-extracted UTF-8 text.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, document: &[u8]) -> Result<String, ExtractionError> {
        let text = String::from_utf8(document.to_vec())
            .map_err(|e| ExtractionError::Rasterize(e.to_string()))?;
        if text.starts_with(CORRUPT_MARKER) {
            return Err(ExtractionError::Rasterize(
                "corrupted document".to_string(),
            ));
        }
        Ok(text.trim().to_string())
    }
}

/// Extracts like `PlainTextExtractor`, but first reports that it started
/// and then waits for a permit, so a test can act while a run is in flight.
pub struct GatedExtractor {
    started: Sender<()>,
    permits: Receiver<()>,
}

impl GatedExtractor {
    /// Returns the extractor, the started-signal receiver and the permit sender.
    pub fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (started_tx, started_rx) = unbounded();
        let (permit_tx, permit_rx) = unbounded();
        let extractor = Self {
            started: started_tx,
            permits: permit_rx,
        };
        (extractor, started_rx, permit_tx)
    }
}

impl TextExtractor for GatedExtractor {
    fn extract(&self, document: &[u8]) -> Result<String, ExtractionError> {
        let _ = self.started.send(());
        let _ = self.permits.recv();
        PlainTextExtractor.extract(document)
    }
}

/// Embeds the reference text as `[1, 0]` and everything else as `answer`.
///
/// Gives the scorer a predictable similarity: the cosine between the two.
pub struct ScriptedEmbedder {
    reference: String,
    answer: [f32; 2],
}

impl ScriptedEmbedder {
    pub fn new(reference: &str, answer: [f32; 2]) -> Self {
        Self {
            reference: reference.to_string(),
            answer,
        }
    }
}

impl SentenceEmbedder for ScriptedEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ScoringError> {
        Ok(texts
            .iter()
            .map(|t| {
                if *t == self.reference {
                    vec![1.0, 0.0]
                } else {
                    self.answer.to_vec()
                }
            })
            .collect())
    }
}

/// Submission store that refuses to mark one id as plagiarized.
pub struct StubbornStore {
    inner: Database,
    reject: String,
}

impl StubbornStore {
    pub fn new(inner: Database, reject: &str) -> Self {
        Self {
            inner,
            reject: reject.to_string(),
        }
    }
}

impl SubmissionStore for StubbornStore {
    fn get(&self, id: &str) -> Result<Option<Submission>, PersistenceError> {
        SubmissionStore::get(&self.inner, id)
    }

    fn load_document(&self, id: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        self.inner.load_document(id)
    }

    fn save(&self, submission: &Submission) -> Result<(), PersistenceError> {
        self.inner.save(submission)
    }

    fn set_field(&self, id: &str, update: FieldUpdate) -> Result<(), PersistenceError> {
        if id == self.reject && matches!(update, FieldUpdate::PlagiarismResult(_)) {
            return Err(PersistenceError::Unavailable("store is read-only".to_string()));
        }
        self.inner.set_field(id, update)
    }

    fn cohort(
        &self,
        assignment_id: &str,
        exclude_id: &str,
    ) -> Result<Vec<SubmissionText>, PersistenceError> {
        self.inner.cohort(assignment_id, exclude_id)
    }
}

/// Builder for creating `Assignment` instances.
pub struct AssignmentBuilder {
    id: String,
    title: String,
    model_answer_text: Option<String>,
}

impl AssignmentBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Assignment {}", id),
            model_answer_text: None,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn model_answer(mut self, text: &str) -> Self {
        self.model_answer_text = Some(text.to_string());
        self
    }

    pub fn build(self) -> Assignment {
        Assignment {
            id: self.id,
            title: self.title,
            model_answer_text: self.model_answer_text,
        }
    }
}

/// Builder for a submission plus the document bytes uploaded with it.
pub struct SubmissionBuilder {
    id: String,
    assignment_id: String,
    student_id: String,
    severity: Severity,
    document: Vec<u8>,
}

impl SubmissionBuilder {
    pub fn new(id: &str, assignment_id: &str) -> Self {
        Self {
            id: id.to_string(),
            assignment_id: assignment_id.to_string(),
            student_id: format!("student-{}", id),
            severity: Severity::default(),
            document: Vec::new(),
        }
    }

    pub fn student(mut self, student_id: &str) -> Self {
        self.student_id = student_id.to_string();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.document = text.as_bytes().to_vec();
        self
    }

    pub fn corrupted(mut self) -> Self {
        self.document = format!("{} \u{0}\u{1}", CORRUPT_MARKER).into_bytes();
        self
    }

    pub fn build(self) -> (Submission, Vec<u8>) {
        let submission = Submission::new(self.assignment_id, self.student_id)
            .with_id(self.id)
            .with_severity(self.severity);
        (submission, self.document)
    }
}
