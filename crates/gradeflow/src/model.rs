//! Domain records shared by the store and the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::plagiarism::PlagiarismDetails;

/// Lifecycle of a submission inside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "Pending",
            ProcessingStatus::Processing => "Processing",
            ProcessingStatus::Completed => "Completed",
            ProcessingStatus::Failed => "Failed",
        }
    }

    /// Whether a run may move a submission from `self` to `next`.
    ///
    /// A finished submission re-enters at `Processing` when re-triggered.
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Completed, Processing)
                | (Failed, Processing)
                | (Processing, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ProcessingStatus::Pending),
            "Processing" => Ok(ProcessingStatus::Processing),
            "Completed" => Ok(ProcessingStatus::Completed),
            "Failed" => Ok(ProcessingStatus::Failed),
            other => Err(format!("unknown processing status '{}'", other)),
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correctness classification. Ordered so that `Incorrect < PartiallyCorrect < Correct`;
/// `Error` sorts below everything and only appears on records written by older
/// tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CorrectnessLabel {
    Error,
    Incorrect,
    #[serde(rename = "Partially Correct")]
    PartiallyCorrect,
    Correct,
}

impl CorrectnessLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectnessLabel::Error => "Error",
            CorrectnessLabel::Incorrect => "Incorrect",
            CorrectnessLabel::PartiallyCorrect => "Partially Correct",
            CorrectnessLabel::Correct => "Correct",
        }
    }
}

impl FromStr for CorrectnessLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Error" => Ok(CorrectnessLabel::Error),
            "Incorrect" => Ok(CorrectnessLabel::Incorrect),
            "Partially Correct" => Ok(CorrectnessLabel::PartiallyCorrect),
            "Correct" => Ok(CorrectnessLabel::Correct),
            other => Err(format!("unknown correctness label '{}'", other)),
        }
    }
}

impl fmt::Display for CorrectnessLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlagiarismVerdict {
    #[serde(rename = "found")]
    Found,
    #[serde(rename = "not found")]
    NotFound,
}

impl PlagiarismVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlagiarismVerdict::Found => "found",
            PlagiarismVerdict::NotFound => "not found",
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PlagiarismVerdict::Found)
    }
}

impl FromStr for PlagiarismVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "found" => Ok(PlagiarismVerdict::Found),
            "not found" => Ok(PlagiarismVerdict::NotFound),
            other => Err(format!("unknown plagiarism verdict '{}'", other)),
        }
    }
}

impl fmt::Display for PlagiarismVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse plagiarism severity chosen by the grader; selects the penalty fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Easy => "easy",
            Severity::Medium => "medium",
            Severity::Hard => "hard",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Severity::Easy),
            "medium" => Ok(Severity::Medium),
            "hard" => Ok(Severity::Hard),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub title: String,
    /// Extracted once when the assignment is created.
    pub model_answer_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub ocr_text: Option<String>,
    /// Similarity to the model answer scaled to [0, 100].
    pub correctness_score: Option<f64>,
    pub correctness_label: Option<CorrectnessLabel>,
    /// Correctness after the plagiarism penalty, never above `correctness_score`.
    pub final_score: Option<f64>,
    pub plagiarism_result: Option<PlagiarismVerdict>,
    pub plagiarism_details: Option<PlagiarismDetails>,
    pub plagiarism_severity: Severity,
    pub processing_status: ProcessingStatus,
    /// Set only when `processing_status` is `Failed`.
    pub processing_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Submission {
    /// A fresh, unprocessed submission with a generated id.
    pub fn new(assignment_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            assignment_id: assignment_id.into(),
            student_id: student_id.into(),
            ocr_text: None,
            correctness_score: None,
            correctness_label: None,
            final_score: None,
            plagiarism_result: None,
            plagiarism_details: None,
            plagiarism_severity: Severity::default(),
            processing_status: ProcessingStatus::Pending,
            processing_error: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.plagiarism_severity = severity;
        self
    }
}

/// The `(id, text)` pair every detector works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionText {
    pub id: String,
    pub text: String,
}

impl SubmissionText {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            ProcessingStatus::Pending,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            ProcessingStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ProcessingStatus>().unwrap(), status);
        }
        assert!("Graded".parse::<ProcessingStatus>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        use ProcessingStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Processing));
        assert!(Completed.can_transition_to(Processing));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
    }

    #[test]
    fn test_label_ordering() {
        assert!(CorrectnessLabel::Incorrect < CorrectnessLabel::PartiallyCorrect);
        assert!(CorrectnessLabel::PartiallyCorrect < CorrectnessLabel::Correct);
        assert!(CorrectnessLabel::Error < CorrectnessLabel::Incorrect);
    }

    #[test]
    fn test_label_parses_legacy_strings() {
        assert_eq!(
            "Partially Correct".parse::<CorrectnessLabel>().unwrap(),
            CorrectnessLabel::PartiallyCorrect
        );
        assert_eq!(
            "Error".parse::<CorrectnessLabel>().unwrap(),
            CorrectnessLabel::Error
        );
        assert!("partially correct".parse::<CorrectnessLabel>().is_err());
    }

    #[test]
    fn test_verdict_serializes_as_legacy_strings() {
        assert_eq!(
            serde_json::to_string(&PlagiarismVerdict::NotFound).unwrap(),
            "\"not found\""
        );
        assert_eq!(
            "found".parse::<PlagiarismVerdict>().unwrap(),
            PlagiarismVerdict::Found
        );
    }

    #[test]
    fn test_severity_defaults_to_medium() {
        assert_eq!(Severity::default(), Severity::Medium);
        let submission = Submission::new("a1", "s1");
        assert_eq!(submission.plagiarism_severity, Severity::Medium);
        assert_eq!(submission.processing_status, ProcessingStatus::Pending);
        assert!(submission.final_score.is_none());
    }
}
