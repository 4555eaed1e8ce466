//! Importer integration tests with the deterministic hash backend.

use std::path::Path;
use std::sync::Arc;

use memo_core::memory::RecordMetadata;
use memo_core::{ContainerTag, MemoConfig, MemoError};
use memo_embeddings::{EmbeddingEngine, HashBackend};
use memo_import::{ChunkerConfig, Importer};
use memo_identity::Provenance;
use memo_storage::StoreEngine;

const DIMS: usize = 32;

fn test_store() -> StoreEngine {
    let config = MemoConfig {
        embedding_dimensions: DIMS,
        ..MemoConfig::default()
    };
    StoreEngine::open_in_memory(&config).unwrap()
}

fn test_embedder() -> EmbeddingEngine {
    EmbeddingEngine::with_backend(Arc::new(HashBackend::new(DIMS)))
}

fn importer<'a>(
    store: &'a StoreEngine,
    embedder: &'a EmbeddingEngine,
    chunker: ChunkerConfig,
) -> Importer<'a> {
    Importer::new(
        store,
        embedder,
        ContainerTag::named("test").unwrap(),
        Provenance::default(),
        chunker,
    )
}

/// 32-char window, no overlap: each 15-char line pair forms one chunk.
fn small_chunker() -> ChunkerConfig {
    ChunkerConfig {
        chunk_tokens: 8,
        overlap_tokens: 0,
    }
}

fn source_key_of(path: &Path) -> String {
    path.canonicalize().unwrap().to_string_lossy().replace('\\', "/")
}

#[tokio::test]
async fn single_file_import_creates_doc_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.md");
    std::fs::write(&file, "line one is 15c\nline two is 15c\nline three 15ch\n").unwrap();

    let store = test_store();
    let embedder = test_embedder();
    let outcome = importer(&store, &embedder, small_chunker())
        .import_markdown(&file)
        .await
        .unwrap();

    assert_eq!(outcome.sources, 1);
    assert_eq!(outcome.inserted, 2);

    let tag = ContainerTag::named("test").unwrap().as_tag();
    let key = source_key_of(&file);
    assert_eq!(store.count_by_source(&tag, &key).unwrap(), 2);

    let records = store.list(Some(&tag), -1).unwrap();
    for record in &records {
        assert_eq!(record.record_type.as_deref(), Some("doc_chunk"));
        assert_eq!(record.source_key.as_deref(), Some(key.as_str()));
        match record.parsed_metadata().expect("metadata parses") {
            RecordMetadata::MarkdownChunk(meta) => {
                assert_eq!(meta.source_key, key);
                assert_eq!(meta.chunk_count, 2);
                assert!(meta.start_line >= 1 && meta.end_line >= meta.start_line);
                assert_eq!(meta.chunk_hash.len(), 64);
            }
            other => panic!("unexpected metadata: {other:?}"),
        }
    }
}

#[tokio::test]
async fn reimport_is_a_full_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("doc.md");
    // 5 lines → 3 chunks under the 32-char window (2+2+1).
    std::fs::write(
        &file,
        "alpha block 15c\nbeta block 15ch\ngamma block 15c\ndelta block 15c\nepsilon blk 15c\n",
    )
    .unwrap();

    let store = test_store();
    let embedder = test_embedder();
    let imp = importer(&store, &embedder, small_chunker());
    let tag = ContainerTag::named("test").unwrap().as_tag();
    let key = source_key_of(&file);

    imp.import_markdown(&file).await.unwrap();
    assert_eq!(store.count_by_source(&tag, &key).unwrap(), 3);
    let first_ids: Vec<String> = store
        .list(Some(&tag), -1)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();

    // Shrink the file so chunking yields fewer chunks, then re-import.
    std::fs::write(&file, "only line left!\n").unwrap();
    let outcome = imp.import_markdown(&file).await.unwrap();
    assert_eq!(outcome.deleted, 3);
    assert_eq!(outcome.inserted, 1);
    assert_eq!(store.count_by_source(&tag, &key).unwrap(), 1);

    let surviving = store.list(Some(&tag), -1).unwrap();
    for old in &first_ids {
        assert!(surviving.iter().all(|r| &r.id != old), "no stale chunk");
    }
}

#[tokio::test]
async fn other_sources_are_untouched_by_replacement() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.md");
    let b = dir.path().join("b.md");
    std::fs::write(&a, "file a content\n").unwrap();
    std::fs::write(&b, "file b content\n").unwrap();

    let store = test_store();
    let embedder = test_embedder();
    let imp = importer(&store, &embedder, small_chunker());
    let tag = ContainerTag::named("test").unwrap().as_tag();

    imp.import_markdown(dir.path()).await.unwrap();
    assert_eq!(store.count(Some(&tag)).unwrap(), 2);

    std::fs::write(&a, "file a rewritten\n").unwrap();
    imp.import_markdown(&a).await.unwrap();

    assert_eq!(store.count_by_source(&tag, &source_key_of(&b)).unwrap(), 1);
    let b_records = store.list(Some(&tag), -1).unwrap();
    assert!(b_records.iter().any(|r| r.content == "file b content"));
    assert!(b_records.iter().any(|r| r.content == "file a rewritten"));
}

#[tokio::test]
async fn directory_walk_recurses_and_skips_non_markdown() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("top.md"), "top file\n").unwrap();
    std::fs::write(dir.path().join("nested/deep.markdown"), "deep file\n").unwrap();
    std::fs::write(dir.path().join("ignored.txt"), "not markdown\n").unwrap();

    let store = test_store();
    let embedder = test_embedder();
    let outcome = importer(&store, &embedder, small_chunker())
        .import_markdown(dir.path())
        .await
        .unwrap();

    assert_eq!(outcome.sources, 2);
    assert_eq!(store.count(None).unwrap(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn symlinks_are_rejected_directly_and_skipped_in_walks() {
    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("real.md");
    std::fs::write(&real, "real content\n").unwrap();
    let link = dir.path().join("link.md");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let store = test_store();
    let embedder = test_embedder();
    let imp = importer(&store, &embedder, small_chunker());

    let err = imp.import_markdown(&link).await.unwrap_err();
    assert!(matches!(err, MemoError::InvalidInput(_)));

    // The walk imports only the real file.
    let outcome = imp.import_markdown(dir.path()).await.unwrap();
    assert_eq!(outcome.sources, 1);
}

#[tokio::test]
async fn path_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store();
    let embedder = test_embedder();
    let imp = importer(&store, &embedder, small_chunker());

    let err = imp
        .import_markdown(&dir.path().join("absent.md"))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoError::NotFound { .. }));

    let txt = dir.path().join("notes.txt");
    std::fs::write(&txt, "plain text").unwrap();
    let err = imp.import_markdown(&txt).await.unwrap_err();
    assert!(matches!(err, MemoError::InvalidInput(_)));
}

#[tokio::test]
async fn private_spans_are_stripped_before_storage() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("mixed.md");
    std::fs::write(
        &file,
        "public heading\n<private>secret line</private>\npublic footer\n",
    )
    .unwrap();

    let store = test_store();
    let embedder = test_embedder();
    importer(&store, &embedder, ChunkerConfig::default())
        .import_markdown(&file)
        .await
        .unwrap();

    let records = store.list(None, -1).unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].content.contains("secret"));
    assert!(records[0].content.contains("public heading"));
}

#[tokio::test]
async fn repo_map_import_one_record_per_entry() {
    let dir = tempfile::tempdir().unwrap();
    let map = dir.path().join("map.json");
    std::fs::write(
        &map,
        r#"[
            {"path": "src/lib.rs", "language": "rust",
             "symbols": ["run", "main"], "content": "crate root"},
            {"path": "README.md"}
        ]"#,
    )
    .unwrap();

    let store = test_store();
    let embedder = test_embedder();
    let outcome = importer(&store, &embedder, ChunkerConfig::default())
        .import_repo_map(&map)
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 2);

    let tag = ContainerTag::named("test").unwrap().as_tag();
    let key = format!("repo-map:{}", source_key_of(&map));
    assert_eq!(store.count_by_source(&tag, &key).unwrap(), 2);

    let records = store.list(Some(&tag), -1).unwrap();
    let lib = records
        .iter()
        .find(|r| r.content.starts_with("src/lib.rs"))
        .unwrap();
    assert_eq!(lib.content, "src/lib.rs [rust] run main\ncrate root");
    match lib.parsed_metadata().unwrap() {
        RecordMetadata::RepoMap(meta) => {
            assert_eq!(meta.import_type, "repo-map");
            assert_eq!(meta.symbols, vec!["run", "main"]);
            assert_eq!(meta.source_key, key);
        }
        other => panic!("unexpected metadata: {other:?}"),
    }
}

#[tokio::test]
async fn repo_map_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let store = test_store();
    let embedder = test_embedder();
    let imp = importer(&store, &embedder, ChunkerConfig::default());

    let not_array = dir.path().join("object.json");
    std::fs::write(&not_array, r#"{"path": "x"}"#).unwrap();
    assert!(matches!(
        imp.import_repo_map(&not_array).await.unwrap_err(),
        MemoError::InvalidInput(_)
    ));

    let no_path = dir.path().join("nopath.json");
    std::fs::write(&no_path, r#"[{"language": "rust"}]"#).unwrap();
    assert!(matches!(
        imp.import_repo_map(&no_path).await.unwrap_err(),
        MemoError::InvalidInput(_)
    ));

    assert!(matches!(
        imp.import_repo_map(&dir.path().join("absent.json"))
            .await
            .unwrap_err(),
        MemoError::NotFound { .. }
    ));
}

#[tokio::test]
async fn reimporting_identical_content_reuses_the_embedding_cache() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("stable.md");
    std::fs::write(&file, "identical content\n").unwrap();

    let store = test_store();
    let embedder = test_embedder();
    let imp = importer(&store, &embedder, ChunkerConfig::default());

    imp.import_markdown(&file).await.unwrap();
    let cached = store.embedding_cache_len().unwrap();
    assert!(cached >= 1);

    imp.import_markdown(&file).await.unwrap();
    assert_eq!(store.embedding_cache_len().unwrap(), cached, "no new rows");
}
