//! BERT-family sentence-transformers model run with candle.
//!
//! Weights, config and tokenizer are fetched from the Hugging Face Hub into
//! the configured cache directory on first use. Sentence vectors are the
//! attention-masked mean of the last hidden state.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use log::info;
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::error::ScoringError;
use crate::scoring::embedder::SentenceEmbedder;

/// Longest token sequence fed to the encoder; longer answers are truncated.
const MAX_SEQUENCE_LENGTH: usize = 256;

pub struct SentenceTransformer {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl SentenceTransformer {
    /// Downloads (if needed) and loads `model_repo` on the CPU.
    pub fn from_hub(model_repo: &str, cache_dir: &Path) -> Result<Self, ScoringError> {
        let files = fetch_model_files(model_repo, cache_dir)?;
        Self::from_files(&files.config, &files.tokenizer, &files.weights)
    }

    pub fn from_files(
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
    ) -> Result<Self, ScoringError> {
        let config_json = std::fs::read_to_string(config_path).map_err(|e| {
            ScoringError::ModelLoad(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        let config: BertConfig = serde_json::from_str(&config_json)
            .map_err(|e| ScoringError::ModelLoad(format!("Invalid model config: {}", e)))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| ScoringError::ModelLoad(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| ScoringError::ModelLoad(format!("Failed to configure truncation: {}", e)))?;

        let device = Device::Cpu;
        // SAFETY: the weights file is owned by the model cache and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device) }
            .map_err(|e| ScoringError::ModelLoad(format!("Failed to map weights: {}", e)))?;
        let model = BertModel::load(vb, &config)
            .map_err(|e| ScoringError::ModelLoad(format!("Failed to build model: {}", e)))?;

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn encode(&self, encodings: &[Encoding]) -> candle_core::Result<Vec<Vec<f32>>> {
        let ids = encodings
            .iter()
            .map(|e| Tensor::new(e.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|e| Tensor::new(e.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over real tokens: (batch, seq, hidden) -> (batch, hidden)
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?;

        pooled.to_vec2::<f32>()
    }
}

impl SentenceEmbedder for SentenceTransformer {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ScoringError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let _span = tracing::debug_span!("scoring.encode", batch = texts.len()).entered();
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| ScoringError::Tokenization(e.to_string()))?;
        self.encode(&encodings)
            .map_err(|e| ScoringError::Encoding(e.to_string()))
    }
}

fn fetch_model_files(model_repo: &str, cache_dir: &Path) -> Result<ModelFiles, ScoringError> {
    std::fs::create_dir_all(cache_dir).map_err(|e| {
        ScoringError::ModelLoad(format!(
            "Failed to create model cache '{}': {}",
            cache_dir.display(),
            e
        ))
    })?;

    let api = ApiBuilder::new()
        .with_cache_dir(cache_dir.to_path_buf())
        .build()
        .map_err(|e| ScoringError::ModelLoad(format!("Failed to reach Hugging Face: {}", e)))?;
    let repo = api.repo(Repo::new(model_repo.to_string(), RepoType::Model));

    let get = |file: &str| {
        repo.get(file).map_err(|e| {
            ScoringError::ModelLoad(format!("Failed to download {}/{}: {}", model_repo, file, e))
        })
    };

    let files = ModelFiles {
        config: get("config.json")?,
        tokenizer: get("tokenizer.json")?,
        weights: get("model.safetensors")?,
    };
    info!("Embedding model {} ready", model_repo);
    Ok(files)
}
