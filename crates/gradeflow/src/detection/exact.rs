use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::detection::minhash::{BandParams, LshIndex, Permutations, Signature};
use crate::detection::text::{shingles, Preprocessor};
use crate::error::DetectionError;
use crate::model::SubmissionText;

/// Shingle width used for hashing.
const SHINGLE_SIZE: usize = 2;

/// A cluster of near-identical submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactCopyGroup {
    pub submission_ids: Vec<String>,
    pub similarity_score: f64,
}

impl ExactCopyGroup {
    pub fn contains(&self, id: &str) -> bool {
        self.submission_ids.iter().any(|s| s == id)
    }
}

/// MinHash + LSH near-duplicate detector.
#[derive(Debug, Clone)]
pub struct ExactCopyDetector {
    preprocessor: Preprocessor,
    permutations: Permutations,
    threshold: f64,
    band_params: BandParams,
}

impl ExactCopyDetector {
    pub fn new(num_permutations: usize, threshold: f64) -> Result<Self, DetectionError> {
        Self::with_preprocessor(num_permutations, threshold, Preprocessor::default())
    }

    pub fn with_preprocessor(
        num_permutations: usize,
        threshold: f64,
        preprocessor: Preprocessor,
    ) -> Result<Self, DetectionError> {
        let permutations = Permutations::new(num_permutations)?;
        let threshold = threshold.clamp(0.0, 1.0);
        Ok(Self {
            preprocessor,
            band_params: BandParams::optimal(threshold, num_permutations),
            permutations,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Clamps `threshold` to [0, 1] and re-derives the index layout.
    pub fn update_threshold(&mut self, threshold: f64) {
        self.threshold = threshold.clamp(0.0, 1.0);
        self.band_params = BandParams::optimal(self.threshold, self.permutations.len());
    }

    pub fn signature(&self, text: &str) -> Signature {
        let tokens = self.preprocessor.tokens(text);
        self.permutations.signature(&shingles(&tokens, SHINGLE_SIZE))
    }

    /// `None` when nothing survives preprocessing; such texts have no
    /// content to compare.
    fn content_signature(&self, text: &str) -> Option<Signature> {
        let tokens = self.preprocessor.tokens(text);
        let shingles = shingles(&tokens, SHINGLE_SIZE);
        (!shingles.is_empty()).then(|| self.permutations.signature(&shingles))
    }

    /// Groups near-duplicates in one pass over `submissions`.
    ///
    /// Each run starts with an empty index. A submission already placed in an
    /// earlier group is skipped entirely, so the first group to claim an id
    /// wins and the result depends on input order.
    pub fn detect_exact_copies(
        &self,
        submissions: &[SubmissionText],
    ) -> Result<Vec<ExactCopyGroup>, DetectionError> {
        let mut index = LshIndex::new(self.threshold, self.band_params);
        let mut processed: HashSet<&str> = HashSet::new();
        let mut groups = Vec::new();

        for submission in submissions {
            if processed.contains(submission.id.as_str()) {
                continue;
            }

            let Some(signature) = self.content_signature(&submission.text) else {
                tracing::debug!(submission_id = %submission.id, "No content to compare");
                continue;
            };
            let matched = index.query(&signature);

            if !matched.is_empty() {
                let members: HashSet<&str> = matched
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(submission.id.as_str()))
                    .collect();

                let mut submission_ids: Vec<String> = Vec::with_capacity(members.len());
                for s in submissions {
                    if members.contains(s.id.as_str()) && !submission_ids.contains(&s.id) {
                        submission_ids.push(s.id.clone());
                    }
                }

                tracing::debug!(
                    submission_id = %submission.id,
                    group_size = submission_ids.len(),
                    "Exact copy group detected"
                );

                for s in submissions {
                    if members.contains(s.id.as_str()) {
                        processed.insert(s.id.as_str());
                    }
                }
                groups.push(ExactCopyGroup {
                    submission_ids,
                    similarity_score: 1.0,
                });
            }

            index.insert(submission.id.clone(), signature);
        }

        Ok(groups)
    }
}
