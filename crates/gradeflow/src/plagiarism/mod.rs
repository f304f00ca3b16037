//! Checks one submission against its cohort with both detectors.
//!
//! The checker never writes to the store. Siblings that matched are returned
//! in `PlagiarismOutcome::also_flag` and the caller decides how to mark them.

use serde::{Deserialize, Serialize};

use crate::detection::{ExactCopyDetector, ExactCopyGroup, TfidfVectorizer};
use crate::error::DetectionError;
use crate::model::{PlagiarismVerdict, SubmissionText};

/// Threshold for the one-vs-rest TF-IDF comparison.
pub const TFIDF_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExactCopyEvidence {
    Group(ExactCopyGroup),
    NoExactCopy { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfComparison {
    pub submission_id: String,
    pub similarity_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParaphraseEvidence {
    pub max_similarity: f64,
    pub threshold: f64,
    pub comparisons: Vec<TfidfComparison>,
}

/// Evidence stored as `plagiarism_details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlagiarismDetails {
    NoCohort {
        message: String,
    },
    /// The target's extracted text is blank, so there is nothing to compare.
    NoContent {
        message: String,
    },
    Compared {
        exact_copy: ExactCopyEvidence,
        tfidf: ParaphraseEvidence,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlagiarismOutcome {
    pub verdict: PlagiarismVerdict,
    pub details: PlagiarismDetails,
    /// Siblings matched by either signal, in cohort order.
    pub also_flag: Vec<String>,
}

pub struct PlagiarismChecker {
    exact: ExactCopyDetector,
    vectorizer: TfidfVectorizer,
    tfidf_threshold: f64,
}

impl PlagiarismChecker {
    pub fn new(exact: ExactCopyDetector) -> Self {
        Self {
            exact,
            vectorizer: TfidfVectorizer::default(),
            tfidf_threshold: TFIDF_THRESHOLD,
        }
    }

    pub fn check_against_cohort(
        &self,
        target: &SubmissionText,
        cohort: &[SubmissionText],
    ) -> Result<PlagiarismOutcome, DetectionError> {
        let _span = tracing::info_span!(
            "plagiarism.check",
            submission_id = %target.id,
            cohort = cohort.len()
        )
        .entered();

        if target.text.trim().is_empty() {
            return Ok(PlagiarismOutcome {
                verdict: PlagiarismVerdict::NotFound,
                details: PlagiarismDetails::NoContent {
                    message: "Submission has no extracted text to compare".to_string(),
                },
                also_flag: Vec::new(),
            });
        }

        if cohort.is_empty() {
            return Ok(PlagiarismOutcome {
                verdict: PlagiarismVerdict::NotFound,
                details: PlagiarismDetails::NoCohort {
                    message: "No other submissions to compare against".to_string(),
                },
                also_flag: Vec::new(),
            });
        }

        let mut combined: Vec<SubmissionText> = cohort.to_vec();
        combined.push(target.clone());

        let group = self
            .exact
            .detect_exact_copies(&combined)?
            .into_iter()
            .find(|g| g.contains(&target.id));

        let texts: Vec<&str> = combined.iter().map(|s| s.text.as_str()).collect();
        let matrix = self.vectorizer.fit_transform(&texts)?;
        let target_row = cohort.len();
        let comparisons: Vec<TfidfComparison> = cohort
            .iter()
            .enumerate()
            .map(|(i, s)| TfidfComparison {
                submission_id: s.id.clone(),
                similarity_score: matrix.cosine(target_row, i),
            })
            .collect();
        let max_similarity = comparisons
            .iter()
            .map(|c| c.similarity_score)
            .fold(0.0, f64::max);
        let tfidf_found = max_similarity >= self.tfidf_threshold;

        let also_flag: Vec<String> = cohort
            .iter()
            .zip(&comparisons)
            .filter(|(s, c)| {
                s.id != target.id
                    && (c.similarity_score >= self.tfidf_threshold
                        || group.as_ref().is_some_and(|g| g.contains(&s.id)))
            })
            .map(|(s, _)| s.id.clone())
            .fold(Vec::new(), |mut ids, id| {
                if !ids.contains(&id) {
                    ids.push(id);
                }
                ids
            });

        let verdict = if group.is_some() || tfidf_found {
            PlagiarismVerdict::Found
        } else {
            PlagiarismVerdict::NotFound
        };

        tracing::info!(
            verdict = %verdict,
            exact_copy = group.is_some(),
            max_similarity,
            "Plagiarism check finished"
        );

        let exact_copy = match group {
            Some(group) => ExactCopyEvidence::Group(group),
            None => ExactCopyEvidence::NoExactCopy {
                message: "No exact copy detected by MinHash+LSH.".to_string(),
            },
        };

        Ok(PlagiarismOutcome {
            verdict,
            details: PlagiarismDetails::Compared {
                exact_copy,
                tfidf: ParaphraseEvidence {
                    max_similarity,
                    threshold: self.tfidf_threshold,
                    comparisons,
                },
            },
            also_flag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> PlagiarismChecker {
        PlagiarismChecker::new(ExactCopyDetector::new(128, 0.5).unwrap())
    }

    fn sub(id: &str, text: &str) -> SubmissionText {
        SubmissionText::new(id, text)
    }

    #[test]
    fn test_empty_cohort_is_not_found() {
        let outcome = checker()
            .check_against_cohort(&sub("t", "anything"), &[])
            .unwrap();
        assert_eq!(outcome.verdict, PlagiarismVerdict::NotFound);
        assert!(matches!(outcome.details, PlagiarismDetails::NoCohort { .. }));
        assert!(outcome.also_flag.is_empty());
    }

    #[test]
    fn test_blank_target_is_not_compared() {
        let cohort = [sub("s1", "Just so."), sub("s2", "")];
        for text in ["", "  \n\t "] {
            let outcome = checker()
                .check_against_cohort(&sub("t", text), &cohort)
                .unwrap();
            assert_eq!(outcome.verdict, PlagiarismVerdict::NotFound);
            assert!(matches!(outcome.details, PlagiarismDetails::NoContent { .. }));
            assert!(outcome.also_flag.is_empty());
        }
    }

    #[test]
    fn test_stopword_only_target_is_not_an_exact_copy() {
        let cohort = [sub("s1", "Just so."), sub("s2", "Photosynthesis needs sunlight")];
        let outcome = checker()
            .check_against_cohort(&sub("t", "So, just."), &cohort)
            .unwrap();
        match outcome.details {
            PlagiarismDetails::Compared { exact_copy, .. } => {
                assert!(matches!(exact_copy, ExactCopyEvidence::NoExactCopy { .. }));
            }
            other => panic!("expected compared details, got {:?}", other),
        }
    }

    #[test]
    fn test_identical_sibling_is_found_and_flagged() {
        let text = "Osmosis is the movement of water across a semipermeable membrane";
        let outcome = checker()
            .check_against_cohort(
                &sub("t", text),
                &[sub("s1", text), sub("s2", "Tides are caused by lunar gravity")],
            )
            .unwrap();

        assert_eq!(outcome.verdict, PlagiarismVerdict::Found);
        assert_eq!(outcome.also_flag, vec!["s1"]);
        match outcome.details {
            PlagiarismDetails::Compared { exact_copy, tfidf } => {
                match exact_copy {
                    ExactCopyEvidence::Group(group) => {
                        assert_eq!(group.submission_ids, vec!["s1", "t"]);
                        assert_eq!(group.similarity_score, 1.0);
                    }
                    other => panic!("Expected exact copy group, got {:?}", other),
                }
                assert_eq!(tfidf.threshold, 0.7);
                assert_eq!(tfidf.comparisons.len(), 2);
                assert!((tfidf.max_similarity - 1.0).abs() < 1e-9);
            }
            other => panic!("Expected comparison details, got {:?}", other),
        }
    }

    #[test]
    fn test_original_work_is_not_found() {
        let outcome = checker()
            .check_against_cohort(
                &sub("t", "Photosynthesis stores solar energy as glucose"),
                &[sub("s1", "Volcanoes form where tectonic plates diverge")],
            )
            .unwrap();

        assert_eq!(outcome.verdict, PlagiarismVerdict::NotFound);
        assert!(outcome.also_flag.is_empty());
        match outcome.details {
            PlagiarismDetails::Compared { exact_copy, tfidf } => {
                assert!(matches!(exact_copy, ExactCopyEvidence::NoExactCopy { .. }));
                assert!(tfidf.max_similarity < 0.7);
            }
            other => panic!("Expected comparison details, got {:?}", other),
        }
    }

    #[test]
    fn test_details_serialize_with_kind_tag() {
        let details = PlagiarismDetails::NoCohort {
            message: "none".to_string(),
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["kind"], "no_cohort");
        let back: PlagiarismDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back, details);
    }
}
