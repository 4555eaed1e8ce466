//! Command logic, separated from argument parsing and rendering so the
//! end-to-end scenarios can be exercised directly in tests.

use std::path::PathBuf;

use memo_core::{ContainerTag, MemoConfig, MemoError, MemoResult, MemoryRecord};
use memo_embeddings::EmbeddingEngine;
use memo_identity::{ProjectIdentity, Provenance};
use memo_import::{ChunkerConfig, ImportOutcome, Importer};
use memo_search::{DedupVerdict, Deduper, HybridSearcher, SearchRequest, SearchResult};
use memo_storage::{ReindexOutcome, StoreEngine};

/// Outcome of `add`.
#[derive(Debug)]
pub enum AddOutcome {
    Stored { id: String },
    /// Blocked by the deduper; reported, not an error.
    Skipped { verdict: DedupVerdict },
}

/// Insert one user memory: strip → embed → dedup-gate → insert.
pub async fn add(
    store: &StoreEngine,
    embedder: &EmbeddingEngine,
    config: &MemoConfig,
    container: &ContainerTag,
    provenance: &Provenance,
    text: &str,
) -> MemoResult<AddOutcome> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MemoError::InvalidInput("empty text".into()));
    }
    let stripped = memo_privacy::strip_for_storage(trimmed)?;
    let vector = embedder.embed(store, &stripped.text).await?;

    let verdict = Deduper::new(store, config).check(&stripped.text, &vector, &container.as_tag())?;
    if verdict.is_duplicate() {
        return Ok(AddOutcome::Skipped { verdict });
    }

    let mut record = MemoryRecord::new(stripped.text, vector, container.clone());
    record.display_name = provenance.display_name.clone();
    record.user_name = provenance.user_name.clone();
    record.user_email = provenance.user_email.clone();
    record.project_path = provenance.project_path.clone();
    record.project_name = provenance.project_name.clone();
    record.git_repo_url = provenance.git_repo_url.clone();

    let id = store.insert(record)?;
    Ok(AddOutcome::Stored { id })
}

/// Hybrid search; embeds the query unless the vector arm is skipped.
#[allow(clippy::too_many_arguments)]
pub async fn search(
    store: &StoreEngine,
    embedder: &EmbeddingEngine,
    config: &MemoConfig,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f64>,
    container: Option<&ContainerTag>,
    skip_vector: bool,
    skip_full_text: bool,
) -> MemoResult<Vec<SearchResult>> {
    if query.trim().is_empty() {
        return Err(MemoError::InvalidInput("empty query".into()));
    }
    if skip_vector && skip_full_text {
        return Err(MemoError::InvalidInput(
            "--skip-vector and --skip-full-text together leave nothing to search".into(),
        ));
    }

    let query_vector = if skip_vector {
        None
    } else {
        Some(embedder.embed(store, query).await?)
    };
    let container_tag = container.map(ContainerTag::as_tag);

    let searcher = HybridSearcher::new(store, config.min_vector_similarity);
    searcher.search(&SearchRequest {
        query_vector: query_vector.as_deref(),
        query_text: (!skip_full_text).then_some(query),
        container_tag: container_tag.as_deref(),
        limit: limit.unwrap_or(config.max_memories),
        threshold: threshold.unwrap_or(config.similarity_threshold),
    })
}

/// Recent records, newest first. `all` lifts the limit.
pub fn list(
    store: &StoreEngine,
    config: &MemoConfig,
    limit: Option<usize>,
    all: bool,
    container: Option<&ContainerTag>,
) -> MemoResult<Vec<MemoryRecord>> {
    let limit = if all {
        -1
    } else {
        limit.unwrap_or(config.max_memories) as i64
    };
    let tag = container.map(ContainerTag::as_tag);
    store.list(tag.as_deref(), limit)
}

/// Delete by id; with an explicit container, refuse a record that lives
/// elsewhere.
pub fn forget(
    store: &StoreEngine,
    id: &str,
    container: Option<&ContainerTag>,
) -> MemoResult<()> {
    let actual = store
        .get_container_tag(id)?
        .ok_or_else(|| MemoError::NotFound {
            what: format!("record {id}"),
        })?;
    if let Some(requested) = container {
        if requested.as_tag() != actual {
            return Err(MemoError::WrongContainer {
                id: id.to_string(),
                requested: requested.as_tag(),
                actual,
            });
        }
    }
    store.delete(id)?;
    Ok(())
}

/// Markdown or repo-map import.
#[allow(clippy::too_many_arguments)]
pub async fn import(
    store: &StoreEngine,
    embedder: &EmbeddingEngine,
    container: &ContainerTag,
    provenance: &Provenance,
    markdown: Option<&PathBuf>,
    repo_map: Option<&PathBuf>,
    chunk_tokens: usize,
    overlap_tokens: usize,
) -> MemoResult<ImportOutcome> {
    let importer = Importer::new(
        store,
        embedder,
        container.clone(),
        provenance.clone(),
        ChunkerConfig {
            chunk_tokens,
            overlap_tokens,
        },
    );
    match (markdown, repo_map) {
        (Some(path), None) => importer.import_markdown(path).await,
        (None, Some(path)) => importer.import_repo_map(path).await,
        _ => Err(MemoError::InvalidInput(
            "give exactly one of --markdown and --repo-map".into(),
        )),
    }
}

pub fn reindex(store: &StoreEngine) -> MemoResult<ReindexOutcome> {
    store.reindex_fulltext()
}

/// Store summary for `status`.
#[derive(Debug)]
pub struct StatusReport {
    pub model: String,
    pub dimensions: usize,
    pub db_path: PathBuf,
    pub record_count: usize,
    pub counts_by_container: Vec<(String, usize)>,
    pub cached_embeddings: usize,
    pub similarity_threshold: f64,
    pub min_vector_similarity: f64,
    pub dedup_threshold: f64,
}

pub fn status(
    store: &StoreEngine,
    config: &MemoConfig,
    identity: &ProjectIdentity,
) -> MemoResult<StatusReport> {
    Ok(StatusReport {
        model: config.embedding_model.clone(),
        dimensions: config.embedding_dimensions,
        db_path: identity.db_path(),
        record_count: store.count(None)?,
        counts_by_container: store.count_by_container()?,
        cached_embeddings: store.embedding_cache_len()?,
        similarity_threshold: config.similarity_threshold,
        min_vector_similarity: config.min_vector_similarity,
        dedup_threshold: config.deduplication_similarity_threshold,
    })
}
