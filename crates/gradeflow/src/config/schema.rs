use serde::{Deserialize, Serialize};

use crate::model::Severity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// SQLite file backing the submission and assignment stores.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Pending jobs accepted before `try_submit` starts rejecting.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub penalties: PenaltyConfig,
}

impl Config {
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.worker_count * 2)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            worker_count: default_worker_count(),
            queue_capacity: None,
            ocr: OcrConfig::default(),
            scoring: ScoringConfig::default(),
            detection: DetectionConfig::default(),
            penalties: PenaltyConfig::default(),
        }
    }
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_dpi() -> u32 {
    300
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_correct_threshold")]
    pub correct_threshold: f64,
    #[serde(default = "default_partially_correct_threshold")]
    pub partially_correct_threshold: f64,
    #[serde(default)]
    pub embedder: EmbedderConfig,
}

fn default_correct_threshold() -> f64 {
    0.8
}

fn default_partially_correct_threshold() -> f64 {
    0.5
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            correct_threshold: default_correct_threshold(),
            partially_correct_threshold: default_partially_correct_threshold(),
            embedder: EmbedderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedderKind {
    /// Feature-hashed n-gram vectors; no model download. Default only in
    /// builds without the `embeddings` feature, and used by the tests.
    Hashing,
    /// Pretrained sentence-transformers model (needs the `embeddings` feature).
    SentenceTransformer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default = "default_embedder_kind")]
    pub kind: EmbedderKind,
    #[serde(default = "default_model_repo")]
    pub model_repo: String,
    #[serde(default = "default_model_cache_dir")]
    pub model_cache_dir: String,
    /// Output dimension of the hashing embedder.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_embedder_kind() -> EmbedderKind {
    if cfg!(feature = "embeddings") {
        EmbedderKind::SentenceTransformer
    } else {
        EmbedderKind::Hashing
    }
}

fn default_model_repo() -> String {
    "sentence-transformers/paraphrase-MiniLM-L6-v2".to_string()
}

fn default_model_cache_dir() -> String {
    dirs::cache_dir()
        .map(|d| d.join("gradeflow").join("models"))
        .unwrap_or_else(|| std::env::temp_dir().join("gradeflow-models"))
        .to_string_lossy()
        .to_string()
}

fn default_dimension() -> usize {
    384
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: default_embedder_kind(),
            model_repo: default_model_repo(),
            model_cache_dir: default_model_cache_dir(),
            dimension: default_dimension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_num_permutations")]
    pub num_permutations: usize,
    #[serde(default = "default_exact_copy_threshold")]
    pub exact_copy_threshold: f64,
    #[serde(default = "default_paraphrase_threshold")]
    pub paraphrase_threshold: f64,
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    /// Replaces the built-in English stopword list for exact-copy preprocessing.
    #[serde(default)]
    pub stopwords: Option<Vec<String>>,
}

fn default_num_permutations() -> usize {
    128
}

fn default_exact_copy_threshold() -> f64 {
    0.5
}

fn default_paraphrase_threshold() -> f64 {
    0.7
}

fn default_max_features() -> usize {
    5000
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            num_permutations: default_num_permutations(),
            exact_copy_threshold: default_exact_copy_threshold(),
            paraphrase_threshold: default_paraphrase_threshold(),
            max_features: default_max_features(),
            stopwords: None,
        }
    }
}

/// Fraction deducted from the correctness score per severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    #[serde(default = "default_easy_penalty")]
    pub easy: f64,
    #[serde(default = "default_medium_penalty")]
    pub medium: f64,
    #[serde(default = "default_hard_penalty")]
    pub hard: f64,
}

fn default_easy_penalty() -> f64 {
    0.10
}

fn default_medium_penalty() -> f64 {
    0.25
}

fn default_hard_penalty() -> f64 {
    0.50
}

impl PenaltyConfig {
    pub fn fraction(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Easy => self.easy,
            Severity::Medium => self.medium,
            Severity::Hard => self.hard,
        }
    }
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            easy: default_easy_penalty(),
            medium: default_medium_penalty(),
            hard: default_hard_penalty(),
        }
    }
}
