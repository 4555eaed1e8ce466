//! Configuration: built-in defaults overlaid with an optional JSONC file at
//! `<user-config-dir>/memo/config.jsonc` (or `.json`). The record is frozen
//! after construction; nothing mutates it at runtime.

pub mod jsonc;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{MemoError, MemoResult};

/// Default embedding model id.
pub const DEFAULT_EMBEDDING_MODEL: &str = "Xenova/nomic-embed-text-v1";

/// Default embedding width for the default model.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

/// The frozen configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoConfig {
    /// Global cache & log root.
    pub storage_path: PathBuf,
    /// Loadable-extension-capable SQLite library, for system builds that
    /// refuse loadable extensions.
    pub custom_sqlite_path: Option<PathBuf>,
    /// Embedding model id.
    pub embedding_model: String,
    /// Embedding width D. Fixed per store after the first write.
    pub embedding_dimensions: usize,
    /// Final quality gate on reported similarity (search stage 6).
    pub similarity_threshold: f64,
    /// KNN gate: minimum cosine similarity to enter fusion (stage 1).
    pub min_vector_similarity: f64,
    /// Default result limit.
    pub max_memories: usize,
    /// Gate on the deduper.
    pub deduplication_enabled: bool,
    /// Near-duplicate cosine cutoff.
    pub deduplication_similarity_threshold: f64,
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            custom_sqlite_path: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            similarity_threshold: 0.5,
            min_vector_similarity: 0.6,
            max_memories: 10,
            deduplication_enabled: true,
            deduplication_similarity_threshold: 0.9,
        }
    }
}

impl MemoConfig {
    /// Load the process configuration. Writes a commented-out template on
    /// first start; absence of a config file is not an error.
    pub fn load() -> MemoResult<Self> {
        let dir = config_dir();
        for name in ["config.jsonc", "config.json"] {
            let path = dir.join(name);
            if path.is_file() {
                return Self::load_from(&path);
            }
        }
        write_template(&dir.join("config.jsonc"));
        Ok(Self::default())
    }

    /// Load from an explicit file. Missing keys fall back to defaults.
    pub fn load_from(path: &Path) -> MemoResult<Self> {
        let raw = fs::read_to_string(path)?;
        let json = jsonc::strip_jsonc(&raw);
        let config: MemoConfig = serde_json::from_str(&json).map_err(|e| {
            MemoError::InvalidInput(format!("config {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

/// `<user-config-dir>/memo`.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("memo")
}

fn default_storage_path() -> PathBuf {
    config_dir().join("data")
}

/// First-start template with every option present but commented out.
fn write_template(path: &Path) {
    if path.exists() {
        return;
    }
    let template = format!(
        r#"{{
  // memo configuration. Uncomment and edit the options you need;
  // anything left commented keeps its built-in default.

  // "storagePath": "{storage}",
  // "customSqlitePath": "/opt/homebrew/opt/sqlite/lib/libsqlite3.dylib",
  // "embeddingModel": "{model}",
  // "embeddingDimensions": {dims},
  // "similarityThreshold": 0.5,
  // "minVectorSimilarity": 0.6,
  // "maxMemories": 10,
  // "deduplicationEnabled": true,
  // "deduplicationSimilarityThreshold": 0.9
}}
"#,
        storage = default_storage_path().display(),
        model = DEFAULT_EMBEDDING_MODEL,
        dims = DEFAULT_EMBEDDING_DIMENSIONS,
    );
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(e) = fs::write(path, template) {
        debug!(path = %path.display(), error = %e, "could not write config template");
    }
}
