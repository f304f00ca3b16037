use serde::{Deserialize, Serialize};

use crate::detection::tfidf::TfidfVectorizer;
use crate::error::DetectionError;
use crate::model::SubmissionText;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParaphrasePair {
    pub id1: String,
    pub id2: String,
    pub similarity_score: f64,
}

/// Flags pairs whose TF-IDF cosine similarity reaches the threshold.
#[derive(Debug, Clone)]
pub struct ParaphraseDetector {
    vectorizer: TfidfVectorizer,
    threshold: f64,
}

impl ParaphraseDetector {
    /// Word 1–3-grams capped at `max_features` terms.
    pub fn new(threshold: f64, max_features: usize) -> Self {
        Self {
            vectorizer: TfidfVectorizer::new(1, 3).with_max_features(max_features),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn update_threshold(&mut self, threshold: f64) {
        self.threshold = threshold.clamp(0.0, 1.0);
    }

    /// Every unordered pair at or above the threshold, reported once with `i < j`.
    pub fn detect_paraphrases(
        &self,
        submissions: &[SubmissionText],
    ) -> Result<Vec<ParaphrasePair>, DetectionError> {
        if submissions.len() < 2 {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = submissions.iter().map(|s| s.text.as_str()).collect();
        let matrix = self.vectorizer.fit_transform(&texts)?;

        let mut pairs = Vec::new();
        for i in 0..submissions.len() {
            for j in (i + 1)..submissions.len() {
                let similarity = matrix.cosine(i, j);
                if similarity >= self.threshold {
                    pairs.push(ParaphrasePair {
                        id1: submissions[i].id.clone(),
                        id2: submissions[j].id.clone(),
                        similarity_score: similarity,
                    });
                }
            }
        }

        tracing::debug!(
            submissions = submissions.len(),
            pairs = pairs.len(),
            "Paraphrase detection finished"
        );
        Ok(pairs)
    }
}

impl Default for ParaphraseDetector {
    fn default() -> Self {
        Self::new(0.7, 5000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(id: &str, text: &str) -> SubmissionText {
        SubmissionText::new(id, text)
    }

    #[test]
    fn test_each_pair_reported_once() {
        let text = "Supply and demand determine market prices in competitive economies";
        let pairs = ParaphraseDetector::default()
            .detect_paraphrases(&[sub("a", text), sub("b", text), sub("c", text)])
            .unwrap();

        let ids: Vec<(&str, &str)> = pairs
            .iter()
            .map(|p| (p.id1.as_str(), p.id2.as_str()))
            .collect();
        assert_eq!(ids, vec![("a", "b"), ("a", "c"), ("b", "c")]);
        assert!(pairs.iter().all(|p| (p.similarity_score - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_dissimilar_texts_not_flagged() {
        let pairs = ParaphraseDetector::default()
            .detect_paraphrases(&[
                sub("a", "Glaciers carve valleys through slow erosion"),
                sub("b", "Enzymes catalyse biochemical reactions in cells"),
            ])
            .unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_threshold_zero_flags_every_pair() {
        let mut detector = ParaphraseDetector::default();
        detector.update_threshold(-0.5);
        assert_eq!(detector.threshold(), 0.0);

        let pairs = detector
            .detect_paraphrases(&[sub("a", "glaciers erode"), sub("b", "enzymes catalyse")])
            .unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_single_submission_has_no_pairs() {
        let pairs = ParaphraseDetector::default()
            .detect_paraphrases(&[sub("a", "anything at all")])
            .unwrap();
        assert!(pairs.is_empty());
    }
}
