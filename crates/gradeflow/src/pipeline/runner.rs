use std::sync::Arc;

use tracing::{error, info, info_span, warn};

use crate::config::{Config, PenaltyConfig};
use crate::detection::CheatingDetector;
use crate::extract::{OcrExtractor, TextExtractor};
use crate::model::{PlagiarismVerdict, ProcessingStatus, Submission, SubmissionText};
use crate::plagiarism::PlagiarismChecker;
use crate::scoring::{build_embedder, CorrectnessScorer};
use crate::store::{AssignmentStore, FieldUpdate, SubmissionStore};

use super::error::PipelineError;
use super::penalty::final_score;

/// Outcome of one pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub submission_id: String,
    pub status: ProcessingStatus,
    pub final_score: Option<f64>,
    pub plagiarism_result: Option<PlagiarismVerdict>,
    /// The message recorded as `processing_error` when the run failed.
    pub error: Option<String>,
    /// Siblings marked as plagiarized by this run.
    pub also_flagged: Vec<String>,
}

/// Processing service. Build once and share it behind an `Arc`.
pub struct Pipeline {
    submissions: Arc<dyn SubmissionStore>,
    assignments: Arc<dyn AssignmentStore>,
    extractor: Arc<dyn TextExtractor>,
    scorer: CorrectnessScorer,
    plagiarism: PlagiarismChecker,
    penalties: PenaltyConfig,
}

/// The fields a successful run produces, before they are persisted.
struct Processed {
    submission: Submission,
    also_flag: Vec<String>,
}

impl Pipeline {
    /// Production constructor: Tesseract extraction and the configured embedder.
    pub fn from_config(
        config: &Config,
        submissions: Arc<dyn SubmissionStore>,
        assignments: Arc<dyn AssignmentStore>,
    ) -> Result<Self, PipelineError> {
        let extractor = Arc::new(OcrExtractor::from_config(&config.ocr));
        let embedder = build_embedder(&config.scoring.embedder)?;
        let scorer = CorrectnessScorer::from_config(embedder, &config.scoring);

        let detector = CheatingDetector::from_config(&config.detection)?;

        Ok(Self::new(
            submissions,
            assignments,
            extractor,
            scorer,
            PlagiarismChecker::new(detector.exact),
            config.penalties,
        ))
    }

    /// Constructor with every collaborator injected.
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        assignments: Arc<dyn AssignmentStore>,
        extractor: Arc<dyn TextExtractor>,
        scorer: CorrectnessScorer,
        plagiarism: PlagiarismChecker,
        penalties: PenaltyConfig,
    ) -> Self {
        Self {
            submissions,
            assignments,
            extractor,
            scorer,
            plagiarism,
            penalties,
        }
    }

    /// Runs the whole pipeline for one submission.
    ///
    /// A failure inside the run is recorded on the submission and reported as
    /// a `Failed` report; only an unknown id or a store that cannot even take
    /// the `Processing` mark is returned as `Err`.
    pub fn run(&self, submission_id: &str) -> Result<RunReport, PipelineError> {
        let _span = info_span!("pipeline", submission_id = %submission_id).entered();

        let submission = match self.submissions.get(submission_id)? {
            Some(s) => s,
            None => {
                error!("Submission {} not found", submission_id);
                return Err(PipelineError::NotFound(submission_id.to_string()));
            }
        };

        if !submission
            .processing_status
            .can_transition_to(ProcessingStatus::Processing)
        {
            warn!(
                "Submission {} entering Processing from {}",
                submission_id, submission.processing_status
            );
        }
        self.submissions
            .set_field(submission_id, FieldUpdate::Status(ProcessingStatus::Processing))?;

        let processed = self
            .process(submission)
            .and_then(|processed| {
                let _step = info_span!("persist").entered();
                self.submissions.save(&processed.submission)?;
                Ok(processed)
            });

        match processed {
            Ok(Processed {
                submission,
                also_flag,
            }) => {
                let also_flagged = self.flag_siblings(&also_flag);
                info!(
                    final_score = ?submission.final_score,
                    plagiarism = ?submission.plagiarism_result,
                    "Successfully processed submission"
                );
                Ok(RunReport {
                    submission_id: submission.id,
                    status: ProcessingStatus::Completed,
                    final_score: submission.final_score,
                    plagiarism_result: submission.plagiarism_result,
                    error: None,
                    also_flagged,
                })
            }
            Err(e) => {
                let message = e.to_string();
                error!("Error processing submission {}: {}", submission_id, message);
                if let Err(save_error) = self
                    .submissions
                    .set_field(submission_id, FieldUpdate::Failed(message.clone()))
                {
                    error!("Error updating submission status: {}", save_error);
                }
                Ok(RunReport {
                    submission_id: submission_id.to_string(),
                    status: ProcessingStatus::Failed,
                    final_score: None,
                    plagiarism_result: None,
                    error: Some(message),
                    also_flagged: Vec::new(),
                })
            }
        }
    }

    /// Re-applies the severity penalty from the stored correctness score and
    /// verdict without re-running extraction, scoring or detection.
    pub fn recompute_final_score(&self, submission_id: &str) -> Result<RunReport, PipelineError> {
        let _span = info_span!("recompute", submission_id = %submission_id).entered();

        let submission = self
            .submissions
            .get(submission_id)?
            .ok_or_else(|| PipelineError::NotFound(submission_id.to_string()))?;

        if submission.processing_status != ProcessingStatus::Completed {
            return Err(PipelineError::NotCompleted {
                id: submission.id,
                status: submission.processing_status,
            });
        }

        let score = final_score(
            submission.correctness_score,
            submission.plagiarism_result,
            submission.plagiarism_severity,
            &self.penalties,
        );
        self.submissions
            .set_field(submission_id, FieldUpdate::FinalScore(score))?;

        info!(final_score = ?score, severity = submission.plagiarism_severity.as_str(), "Final score recomputed");

        Ok(RunReport {
            submission_id: submission.id,
            status: ProcessingStatus::Completed,
            final_score: score,
            plagiarism_result: submission.plagiarism_result,
            error: None,
            also_flagged: Vec::new(),
        })
    }

    fn process(&self, mut submission: Submission) -> Result<Processed, PipelineError> {
        // Step 1: extract text
        let text = {
            let _step = info_span!("extract_text").entered();
            let document = self
                .submissions
                .load_document(&submission.id)?
                .ok_or_else(|| PipelineError::MissingDocument(submission.id.clone()))?;
            self.extractor.extract(&document)?
        };

        // Step 2: correctness against the model answer
        {
            let _step = info_span!("score_correctness").entered();
            let model_answer = self
                .assignments
                .get(&submission.assignment_id)?
                .and_then(|a| a.model_answer_text)
                .filter(|t| !t.trim().is_empty());

            match model_answer {
                Some(reference) => {
                    let assessment = self.scorer.score(&text, &reference)?;
                    submission.correctness_score = Some(assessment.score());
                    submission.correctness_label = Some(assessment.label);
                }
                None => {
                    info!("Assignment has no model answer; skipping correctness");
                    submission.correctness_score = None;
                    submission.correctness_label = None;
                }
            }
        }

        // Step 3: plagiarism against the cohort
        let outcome = {
            let _step = info_span!("check_plagiarism").entered();
            let cohort = self
                .submissions
                .cohort(&submission.assignment_id, &submission.id)?;
            let target = SubmissionText::new(submission.id.clone(), text.clone());
            self.plagiarism.check_against_cohort(&target, &cohort)?
        };

        // Step 4: penalty, with the severity as it stands now; a grader may
        // have changed it while the earlier steps ran.
        if let Some(current) = self.submissions.get(&submission.id)? {
            submission.plagiarism_severity = current.plagiarism_severity;
        }
        submission.final_score = final_score(
            submission.correctness_score,
            Some(outcome.verdict),
            submission.plagiarism_severity,
            &self.penalties,
        );

        submission.ocr_text = Some(text);
        submission.plagiarism_result = Some(outcome.verdict);
        submission.plagiarism_details = Some(outcome.details);
        submission.processing_status = ProcessingStatus::Completed;
        submission.processing_error = None;

        Ok(Processed {
            submission,
            also_flag: outcome.also_flag,
        })
    }

    /// Best-effort: a sibling that cannot be updated is logged and skipped.
    fn flag_siblings(&self, ids: &[String]) -> Vec<String> {
        let mut flagged = Vec::with_capacity(ids.len());
        for id in ids {
            match self
                .submissions
                .set_field(id, FieldUpdate::PlagiarismResult(PlagiarismVerdict::Found))
            {
                Ok(()) => flagged.push(id.clone()),
                Err(e) => warn!("Failed to flag sibling submission {}: {}", id, e),
            }
        }
        flagged
    }
}
