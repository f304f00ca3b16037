//! Correctness scoring against the model answer.
//!
//! The trained sentence-transformers encoder is compiled in with the
//! "embeddings" feature. Without it only the hashing embedder is available.

pub mod correctness;
pub mod embedder;

#[cfg(feature = "embeddings")]
pub mod sentence_transformer;

pub use correctness::{CorrectnessAssessment, CorrectnessScorer, CorrectnessThresholds};
pub use embedder::{cosine_similarity, HashingEmbedder, SentenceEmbedder};

#[cfg(feature = "embeddings")]
pub use sentence_transformer::SentenceTransformer;

use std::sync::Arc;

use crate::config::{EmbedderConfig, EmbedderKind};
use crate::error::ScoringError;

/// Builds the embedder selected in the config.
pub fn build_embedder(config: &EmbedderConfig) -> Result<Arc<dyn SentenceEmbedder>, ScoringError> {
    match config.kind {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimension))),
        EmbedderKind::SentenceTransformer => load_sentence_transformer(config),
    }
}

#[cfg(feature = "embeddings")]
fn load_sentence_transformer(
    config: &EmbedderConfig,
) -> Result<Arc<dyn SentenceEmbedder>, ScoringError> {
    let model = SentenceTransformer::from_hub(
        &config.model_repo,
        std::path::Path::new(&config.model_cache_dir),
    )?;
    Ok(Arc::new(model))
}

#[cfg(not(feature = "embeddings"))]
fn load_sentence_transformer(
    _config: &EmbedderConfig,
) -> Result<Arc<dyn SentenceEmbedder>, ScoringError> {
    Err(ScoringError::ModelLoad(
        "embeddings feature is not enabled. Rebuild with --features embeddings".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_hashing_embedder() {
        let config = EmbedderConfig {
            kind: EmbedderKind::Hashing,
            dimension: 32,
            ..EmbedderConfig::default()
        };
        let embedder = build_embedder(&config).unwrap();
        let vectors = embedder.embed(&["hello world"]).unwrap();
        assert_eq!(vectors[0].len(), 32);
    }

    #[cfg(not(feature = "embeddings"))]
    #[test]
    fn test_sentence_transformer_requires_feature() {
        let config = EmbedderConfig {
            kind: EmbedderKind::SentenceTransformer,
            ..EmbedderConfig::default()
        };
        match build_embedder(&config) {
            Err(ScoringError::ModelLoad(msg)) => assert!(msg.contains("embeddings")),
            Err(other) => panic!("Expected ModelLoad error, got {:?}", other),
            Ok(_) => panic!("Expected ModelLoad error"),
        }
    }
}
