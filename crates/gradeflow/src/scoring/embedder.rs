use crate::error::ScoringError;

/// Encodes texts into a shared semantic vector space.
pub trait SentenceEmbedder: Send + Sync {
    /// Returns one vector per input text, in input order.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ScoringError>;
}

/// Deterministic signed feature hashing of word 1–3-grams.
///
/// Texts sharing no n-grams land on (nearly) orthogonal vectors and identical
/// texts embed identically, so it stands in for a trained model where none
/// can be downloaded.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

const HASH_DOMAIN: &[u8] = b"gradeflow_embed_v1:";
const MAX_NGRAM: usize = 3;

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let normalized = normalize_for_embedding(text);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let mut vector = vec![0.0f32; self.dimension];

        for n in 1..=MAX_NGRAM {
            for window in tokens.windows(n) {
                let gram = window.join(" ");
                let (index, sign) = self.feature(&gram);
                vector[index] += sign;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-8 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }

    fn feature(&self, gram: &str) -> (usize, f32) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HASH_DOMAIN);
        hasher.update(gram.as_bytes());
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();

        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&bytes[..8]);
        let index = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 1 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl SentenceEmbedder for HashingEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ScoringError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn normalize_for_embedding(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

/// Cosine of the angle between two vectors; 0 when either has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a < 1e-12 || norm_b < 1e-12 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
