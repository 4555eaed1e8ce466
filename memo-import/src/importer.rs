//! Import orchestration: validate the input path, build the record set per
//! source key (privacy-strip → chunk → embed), then replace-by-source.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use memo_core::memory::{MarkdownChunkMeta, RecordMetadata, RepoMapMeta, RECORD_TYPE_DOC_CHUNK};
use memo_core::{ContainerTag, MemoError, MemoResult, MemoryRecord};
use memo_embeddings::EmbeddingEngine;
use memo_identity::Provenance;
use memo_storage::StoreEngine;

use crate::chunker::{chunk_lines, ChunkerConfig};
use crate::repo_map::parse_repo_map;

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

/// Aggregate result of one import command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub sources: usize,
    pub deleted: usize,
    pub inserted: usize,
}

/// Imports markdown trees and repo maps into one container.
pub struct Importer<'a> {
    store: &'a StoreEngine,
    embedder: &'a EmbeddingEngine,
    container: ContainerTag,
    provenance: Provenance,
    chunker: ChunkerConfig,
}

impl<'a> Importer<'a> {
    pub fn new(
        store: &'a StoreEngine,
        embedder: &'a EmbeddingEngine,
        container: ContainerTag,
        provenance: Provenance,
        chunker: ChunkerConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            container,
            provenance,
            chunker,
        }
    }

    /// Import a markdown file or a directory tree of markdown files.
    pub async fn import_markdown(&self, path: &Path) -> MemoResult<ImportOutcome> {
        let meta = std::fs::symlink_metadata(path).map_err(|_| MemoError::NotFound {
            what: format!("import path {}", path.display()),
        })?;
        if meta.file_type().is_symlink() {
            return Err(MemoError::InvalidInput(format!(
                "{} is a symlink; give the real path",
                path.display()
            )));
        }

        if meta.is_file() {
            if !has_markdown_extension(path) {
                return Err(MemoError::InvalidInput(format!(
                    "{} is not a markdown file (.md/.markdown/.mdx)",
                    path.display()
                )));
            }
            let (deleted, inserted) = self.import_markdown_file(path).await?;
            return Ok(ImportOutcome {
                sources: 1,
                deleted,
                inserted,
            });
        }

        if !meta.is_dir() {
            return Err(MemoError::InvalidInput(format!(
                "{} is neither a file nor a directory",
                path.display()
            )));
        }

        let mut outcome = ImportOutcome::default();
        for file in markdown_files(path) {
            let (deleted, inserted) = self.import_markdown_file(&file).await?;
            outcome.sources += 1;
            outcome.deleted += deleted;
            outcome.inserted += inserted;
        }
        info!(
            path = %path.display(),
            sources = outcome.sources,
            inserted = outcome.inserted,
            "markdown import complete"
        );
        Ok(outcome)
    }

    /// One file: read → privacy-strip → chunk → embed → replace.
    async fn import_markdown_file(&self, path: &Path) -> MemoResult<(usize, usize)> {
        let raw = std::fs::read_to_string(path)?;
        let stripped = memo_privacy::strip(&raw);
        let source_key = source_key_for(path);
        let chunks = chunk_lines(&stripped.text, &self.chunker);
        let chunk_count = chunks.len();
        debug!(source = %source_key, chunks = chunk_count, "chunked");

        let mut records = Vec::with_capacity(chunk_count);
        for (index, chunk) in chunks.into_iter().enumerate() {
            let metadata = RecordMetadata::MarkdownChunk(MarkdownChunkMeta {
                source_path: source_key.clone(),
                source_key: source_key.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                chunk_index: index,
                chunk_count,
                chunk_hash: chunk.hash,
            });
            records.push(self.build_record(chunk.text, &source_key, &metadata).await?);
        }

        let outcome = self
            .store
            .replace_by_source(&self.container.as_tag(), &source_key, records)?;
        Ok((outcome.deleted, outcome.inserted))
    }

    /// Import a repo-map JSON file: one record per entry, no chunking.
    pub async fn import_repo_map(&self, path: &Path) -> MemoResult<ImportOutcome> {
        let meta = std::fs::symlink_metadata(path).map_err(|_| MemoError::NotFound {
            what: format!("repo map {}", path.display()),
        })?;
        if meta.file_type().is_symlink() {
            return Err(MemoError::InvalidInput(format!(
                "{} is a symlink; give the real path",
                path.display()
            )));
        }
        if !meta.is_file() {
            return Err(MemoError::InvalidInput(format!(
                "{} is not a file",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path)?;
        let entries = parse_repo_map(&raw)?;
        let source_key = format!("repo-map:{}", source_key_for(path));

        let mut records = Vec::with_capacity(entries.len());
        for entry in &entries {
            let metadata = RecordMetadata::RepoMap(RepoMapMeta {
                source_path: entry.path.clone(),
                source_key: source_key.clone(),
                language: entry.language.clone(),
                symbols: entry.symbols.clone(),
                import_type: "repo-map".to_string(),
            });
            let content = entry.to_record_content();
            records.push(self.build_record(content, &source_key, &metadata).await?);
        }

        let outcome = self
            .store
            .replace_by_source(&self.container.as_tag(), &source_key, records)?;
        info!(
            source = %source_key,
            entries = outcome.inserted,
            "repo map import complete"
        );
        Ok(ImportOutcome {
            sources: 1,
            deleted: outcome.deleted,
            inserted: outcome.inserted,
        })
    }

    async fn build_record(
        &self,
        content: String,
        source_key: &str,
        metadata: &RecordMetadata,
    ) -> MemoResult<MemoryRecord> {
        let vector = self.embedder.embed(self.store, &content).await?;
        let mut record = MemoryRecord::new(content, vector, self.container.clone());
        record.source_key = Some(source_key.to_string());
        record.record_type = Some(RECORD_TYPE_DOC_CHUNK.to_string());
        record.metadata = Some(metadata.to_json()?);
        record.display_name = self.provenance.display_name.clone();
        record.user_name = self.provenance.user_name.clone();
        record.user_email = self.provenance.user_email.clone();
        record.project_path = self.provenance.project_path.clone();
        record.project_name = self.provenance.project_name.clone();
        record.git_repo_url = self.provenance.git_repo_url.clone();
        Ok(record)
    }
}

/// Canonical real path, separators normalised to `/`.
fn source_key_for(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    canonical.to_string_lossy().replace('\\', "/")
}

fn has_markdown_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MARKDOWN_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Markdown files under a directory: recursive, file-name ascending,
/// symlinks skipped.
fn markdown_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| !entry.path_is_symlink())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_markdown_extension(path))
        .collect()
}
