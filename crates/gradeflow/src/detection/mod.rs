//! Plagiarism signals: MinHash near-duplicates and TF-IDF paraphrases.

pub mod exact;
pub mod minhash;
pub mod paraphrase;
pub mod text;
pub mod tfidf;

pub use exact::{ExactCopyDetector, ExactCopyGroup};
pub use paraphrase::{ParaphraseDetector, ParaphrasePair};
pub use text::Preprocessor;
pub use tfidf::{TfidfMatrix, TfidfVectorizer};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::error::DetectionError;
use crate::model::SubmissionText;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortStatistics {
    pub total_submissions: usize,
    pub suspicious_submissions: usize,
    pub exact_copy_cases: usize,
    pub paraphrase_cases: usize,
    /// Percentage of suspicious submissions, rounded to two decimals.
    pub suspicious_percentage: f64,
}

/// Both detectors run over a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortAnalysis {
    pub exact_copies: Vec<ExactCopyGroup>,
    pub paraphrases: Vec<ParaphrasePair>,
    /// Ids involved in any case, in input order.
    pub suspicious_ids: Vec<String>,
    pub statistics: CohortStatistics,
}

/// Owns both detectors, configured together.
#[derive(Debug, Clone)]
pub struct CheatingDetector {
    pub exact: ExactCopyDetector,
    pub paraphrase: ParaphraseDetector,
}

impl CheatingDetector {
    pub fn from_config(config: &DetectionConfig) -> Result<Self, DetectionError> {
        let preprocessor = match &config.stopwords {
            Some(words) => Preprocessor::with_stopwords(words),
            None => Preprocessor::default(),
        };
        Ok(Self {
            exact: ExactCopyDetector::with_preprocessor(
                config.num_permutations,
                config.exact_copy_threshold,
                preprocessor,
            )?,
            paraphrase: ParaphraseDetector::new(config.paraphrase_threshold, config.max_features),
        })
    }

    pub fn update_thresholds(&mut self, exact: Option<f64>, paraphrase: Option<f64>) {
        if let Some(exact) = exact {
            self.exact.update_threshold(exact);
        }
        if let Some(paraphrase) = paraphrase {
            self.paraphrase.update_threshold(paraphrase);
        }
    }

    pub fn analyze_submissions(
        &self,
        submissions: &[SubmissionText],
    ) -> Result<CohortAnalysis, DetectionError> {
        let exact_copies = self.exact.detect_exact_copies(submissions)?;
        let paraphrases = self.paraphrase.detect_paraphrases(submissions)?;

        let mut flagged: HashSet<&str> = HashSet::new();
        for group in &exact_copies {
            flagged.extend(group.submission_ids.iter().map(String::as_str));
        }
        for pair in &paraphrases {
            flagged.insert(pair.id1.as_str());
            flagged.insert(pair.id2.as_str());
        }

        let mut suspicious_ids: Vec<String> = Vec::new();
        for s in submissions {
            if flagged.contains(s.id.as_str()) && !suspicious_ids.contains(&s.id) {
                suspicious_ids.push(s.id.clone());
            }
        }

        let suspicious_percentage = if submissions.is_empty() {
            0.0
        } else {
            round2(suspicious_ids.len() as f64 * 100.0 / submissions.len() as f64)
        };

        let statistics = CohortStatistics {
            total_submissions: submissions.len(),
            suspicious_submissions: suspicious_ids.len(),
            exact_copy_cases: exact_copies.len(),
            paraphrase_cases: paraphrases.len(),
            suspicious_percentage,
        };

        Ok(CohortAnalysis {
            exact_copies,
            paraphrases,
            suspicious_ids,
            statistics,
        })
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
