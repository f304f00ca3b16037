pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str};
pub use schema::{
    Config, DetectionConfig, EmbedderConfig, EmbedderKind, OcrConfig, PenaltyConfig,
    ScoringConfig,
};

use std::path::PathBuf;

/// Returns the canonical database path: `~/.gradeflow/data/gradeflow.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".gradeflow").join("data").join("gradeflow.db"))
}
