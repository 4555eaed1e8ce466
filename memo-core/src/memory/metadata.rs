//! Typed view over the opaque metadata text column.
//!
//! The store never interprets metadata; import writes it and the CLI parses
//! it back for source-aware rendering.

use serde::{Deserialize, Serialize};

/// Metadata written for a chunk of an imported markdown file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownChunkMeta {
    pub source_path: String,
    pub source_key: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_index: usize,
    pub chunk_count: usize,
    pub chunk_hash: String,
}

/// Metadata written for one entry of an imported repo map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMapMeta {
    pub source_path: String,
    pub source_key: String,
    pub language: String,
    pub symbols: Vec<String>,
    /// Always `"repo-map"`; distinguishes the variants on parse.
    pub import_type: String,
}

/// The two metadata shapes carried by imported records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordMetadata {
    RepoMap(RepoMapMeta),
    MarkdownChunk(MarkdownChunkMeta),
}

impl RecordMetadata {
    /// Serialize for the store's opaque text column.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
