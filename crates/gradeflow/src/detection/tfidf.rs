//! Word n-gram TF-IDF vector space, fit fresh for every batch.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::detection::text::TFIDF_STOPWORDS;
use crate::error::DetectionError;

fn token_pattern() -> Result<&'static Regex, DetectionError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\b\w\w+\b"))
        .as_ref()
        .map_err(|e| DetectionError::InvalidConfig(format!("token pattern: {}", e)))
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    min_n: usize,
    max_n: usize,
    max_features: Option<usize>,
    stopwords: HashSet<&'static str>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl TfidfVectorizer {
    /// Vectorizer over word n-grams with `min_n..=max_n` tokens, English stopwords removed.
    pub fn new(min_n: usize, max_n: usize) -> Self {
        let min_n = min_n.max(1);
        Self {
            min_n,
            max_n: max_n.max(min_n),
            max_features: None,
            stopwords: TFIDF_STOPWORDS.iter().copied().collect(),
        }
    }

    /// Keeps only the `max_features` most frequent terms across the batch.
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    fn analyze(&self, text: &str) -> Result<Vec<String>, DetectionError> {
        let folded: String = text
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .collect::<String>()
            .to_lowercase();

        let tokens: Vec<&str> = token_pattern()?
            .find_iter(&folded)
            .map(|m| m.as_str())
            .filter(|t| !self.stopwords.contains(*t))
            .collect();

        let mut terms = Vec::new();
        for n in self.min_n..=self.max_n {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        Ok(terms)
    }

    /// Fits the vocabulary and idf weights on `texts` and returns one
    /// L2-normalised row per text.
    pub fn fit_transform<S: AsRef<str>>(&self, texts: &[S]) -> Result<TfidfMatrix, DetectionError> {
        let analyzed: Vec<HashMap<String, usize>> = texts
            .iter()
            .map(|t| {
                let mut counts = HashMap::new();
                for term in self.analyze(t.as_ref())? {
                    *counts.entry(term).or_insert(0usize) += 1;
                }
                Ok(counts)
            })
            .collect::<Result<_, DetectionError>>()?;

        let mut corpus_counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for doc in &analyzed {
            for (term, count) in doc {
                let entry = corpus_counts.entry(term.as_str()).or_insert((0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }

        if corpus_counts.is_empty() {
            return Err(DetectionError::EmptyVocabulary);
        }

        let mut terms: Vec<(&str, usize, usize)> = corpus_counts
            .into_iter()
            .map(|(term, (total, df))| (term, total, df))
            .collect();
        if let Some(limit) = self.max_features {
            terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            terms.truncate(limit);
        }
        terms.sort_by(|a, b| a.0.cmp(b.0));

        let n_docs = texts.len() as f64;
        let vocabulary: HashMap<&str, (usize, f64)> = terms
            .iter()
            .enumerate()
            .map(|(column, (term, _, df))| {
                let idf = ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0;
                (*term, (column, idf))
            })
            .collect();

        let rows = analyzed
            .iter()
            .map(|doc| {
                let mut row: Vec<(usize, f64)> = doc
                    .iter()
                    .filter_map(|(term, count)| {
                        vocabulary
                            .get(term.as_str())
                            .map(|(column, idf)| (*column, *count as f64 * idf))
                    })
                    .collect();
                row.sort_by_key(|(column, _)| *column);

                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in row.iter_mut() {
                        *w /= norm;
                    }
                }
                row
            })
            .collect();

        Ok(TfidfMatrix {
            rows,
            n_features: vocabulary.len(),
        })
    }
}

/// Sparse, row-normalised document-term matrix.
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    rows: Vec<Vec<(usize, f64)>>,
    n_features: usize,
}

impl TfidfMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Cosine similarity between rows `i` and `j`; 0 for an all-zero row.
    pub fn cosine(&self, i: usize, j: usize) -> f64 {
        let (a, b) = (&self.rows[i], &self.rows[j]);
        let (mut x, mut y) = (0, 0);
        let mut dot = 0.0;
        while x < a.len() && y < b.len() {
            match a[x].0.cmp(&b[y].0) {
                std::cmp::Ordering::Less => x += 1,
                std::cmp::Ordering::Greater => y += 1,
                std::cmp::Ordering::Equal => {
                    dot += a[x].1 * b[y].1;
                    x += 1;
                    y += 1;
                }
            }
        }
        dot.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_documents_have_similarity_one() {
        let matrix = TfidfVectorizer::new(1, 3)
            .fit_transform(&["plants convert sunlight", "plants convert sunlight", "rocks"])
            .unwrap();
        assert!((matrix.cosine(0, 1) - 1.0).abs() < 1e-9);
        assert_eq!(matrix.cosine(0, 2), 0.0);
    }

    #[test]
    fn test_accents_and_case_are_folded() {
        let matrix = TfidfVectorizer::default()
            .fit_transform(&["Café Résumé", "cafe resume"])
            .unwrap();
        assert!((matrix.cosine(0, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stopwords_only_is_empty_vocabulary() {
        let result = TfidfVectorizer::default().fit_transform(&["the and of", "a an"]);
        assert!(matches!(result, Err(DetectionError::EmptyVocabulary)));
    }

    #[test]
    fn test_single_character_tokens_ignored() {
        let vectorizer = TfidfVectorizer::default();
        assert_eq!(vectorizer.analyze("x y zz").unwrap(), vec!["zz".to_string()]);
    }

    #[test]
    fn test_ngram_range() {
        let vectorizer = TfidfVectorizer::new(1, 3);
        let terms = vectorizer.analyze("red green blue").unwrap();
        assert!(terms.contains(&"red green".to_string()));
        assert!(terms.contains(&"red green blue".to_string()));
        assert_eq!(terms.len(), 6);
    }

    #[test]
    fn test_max_features_caps_vocabulary() {
        let matrix = TfidfVectorizer::new(1, 1)
            .with_max_features(2)
            .fit_transform(&["apple apple banana", "apple cherry banana", "durian"])
            .unwrap();
        assert_eq!(matrix.n_features(), 2);
        assert_eq!(matrix.n_rows(), 3);
    }

    #[test]
    fn test_smoothed_idf_weights() {
        // "shared" appears in both docs, "solo" only in the first.
        let matrix = TfidfVectorizer::default()
            .fit_transform(&["shared solo", "shared"])
            .unwrap();
        let idf_solo = (3.0f64 / 2.0).ln() + 1.0;
        let expected = 1.0 / (1.0 + idf_solo * idf_solo).sqrt();
        assert!((matrix.cosine(0, 1) - expected).abs() < 1e-9);
    }
}
