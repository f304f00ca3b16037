use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::model::CorrectnessLabel;
use crate::scoring::embedder::{cosine_similarity, SentenceEmbedder};

/// Similarity cut-offs for the correctness labels. `partially_correct <= correct`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectnessThresholds {
    pub correct: f64,
    pub partially_correct: f64,
}

impl Default for CorrectnessThresholds {
    fn default() -> Self {
        Self {
            correct: 0.8,
            partially_correct: 0.5,
        }
    }
}

impl CorrectnessThresholds {
    pub fn label(&self, similarity: f64) -> CorrectnessLabel {
        if similarity >= self.correct {
            CorrectnessLabel::Correct
        } else if similarity >= self.partially_correct {
            CorrectnessLabel::PartiallyCorrect
        } else {
            CorrectnessLabel::Incorrect
        }
    }

    /// Piecewise-linear confidence, continuous at both thresholds for the defaults.
    pub fn confidence(&self, similarity: f64) -> f64 {
        let confidence = if similarity >= self.correct {
            0.9 + (similarity - self.correct) * 0.1
        } else if similarity >= self.partially_correct {
            0.5 + (similarity - self.partially_correct) * 0.4
        } else {
            similarity
        };
        confidence.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectnessAssessment {
    /// Cosine similarity clamped to [0, 1].
    pub similarity: f64,
    pub label: CorrectnessLabel,
    pub confidence: f64,
}

impl CorrectnessAssessment {
    /// Similarity on the 0–100 scale stored as `correctness_score`.
    pub fn score(&self) -> f64 {
        self.similarity * 100.0
    }
}

pub struct CorrectnessScorer {
    embedder: Arc<dyn SentenceEmbedder>,
    thresholds: CorrectnessThresholds,
}

impl CorrectnessScorer {
    pub fn new(embedder: Arc<dyn SentenceEmbedder>) -> Self {
        Self {
            embedder,
            thresholds: CorrectnessThresholds::default(),
        }
    }

    pub fn from_config(embedder: Arc<dyn SentenceEmbedder>, config: &ScoringConfig) -> Self {
        let mut scorer = Self::new(embedder);
        scorer.update_thresholds(
            Some(config.correct_threshold),
            Some(config.partially_correct_threshold),
        );
        scorer
    }

    pub fn thresholds(&self) -> CorrectnessThresholds {
        self.thresholds
    }

    /// Compares a student's answer against the reference answer.
    pub fn score(
        &self,
        candidate: &str,
        reference: &str,
    ) -> Result<CorrectnessAssessment, ScoringError> {
        let vectors = self.embed_exact(&[candidate, reference])?;
        Ok(self.assess(cosine_similarity(&vectors[0], &vectors[1])))
    }

    /// Scores aligned `(candidate, reference)` pairs with a single encoder pass.
    /// Fails as a whole; there is no partial result.
    pub fn score_batch(
        &self,
        candidates: &[&str],
        references: &[&str],
    ) -> Result<Vec<CorrectnessAssessment>, ScoringError> {
        if candidates.len() != references.len() {
            return Err(ScoringError::BatchMismatch {
                candidates: candidates.len(),
                references: references.len(),
            });
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = candidates.iter().chain(references).copied().collect();
        let vectors = self.embed_exact(&texts)?;
        let (candidate_vecs, reference_vecs) = vectors.split_at(candidates.len());

        Ok(candidate_vecs
            .iter()
            .zip(reference_vecs)
            .map(|(c, r)| self.assess(cosine_similarity(c, r)))
            .collect())
    }

    /// Replaces the thresholds. Values are clamped to [0, 1] and
    /// `partially_correct` is lowered to `correct` if it would exceed it.
    pub fn update_thresholds(&mut self, correct: Option<f64>, partially_correct: Option<f64>) {
        if let Some(correct) = correct {
            self.thresholds.correct = correct.clamp(0.0, 1.0);
        }
        if let Some(partially_correct) = partially_correct {
            self.thresholds.partially_correct = partially_correct.clamp(0.0, 1.0);
        }
        if self.thresholds.partially_correct > self.thresholds.correct {
            self.thresholds.partially_correct = self.thresholds.correct;
        }
    }

    fn assess(&self, raw_similarity: f64) -> CorrectnessAssessment {
        let similarity = raw_similarity.clamp(0.0, 1.0);
        CorrectnessAssessment {
            similarity,
            label: self.thresholds.label(similarity),
            confidence: self.thresholds.confidence(similarity),
        }
    }

    fn embed_exact(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ScoringError> {
        let vectors = self.embedder.embed(texts)?;
        if vectors.len() != texts.len() {
            return Err(ScoringError::Encoding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}
