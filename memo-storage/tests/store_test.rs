//! Integration tests: three-table synchronisation, replace-by-source,
//! reindex, dimension pinning, embedding cache.

use memo_core::errors::StorageError;
use memo_core::{ContainerTag, MemoConfig, MemoError, MemoryRecord};
use memo_storage::StoreEngine;

fn test_config(dims: usize) -> MemoConfig {
    MemoConfig {
        embedding_dimensions: dims,
        ..MemoConfig::default()
    }
}

fn container() -> ContainerTag {
    ContainerTag::named("test").unwrap()
}

fn make_record(content: &str, vector: Vec<f32>) -> MemoryRecord {
    MemoryRecord::new(content.to_string(), vector, container())
}

fn unit(dims: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; dims];
    v[axis] = 1.0;
    v
}

#[test]
fn insert_populates_all_three_tables() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    let id = engine
        .insert(make_record("bcrypt password hashing", unit(4, 0)))
        .unwrap();

    assert_eq!(engine.count(None).unwrap(), 1);

    let knn = engine.knn_candidates(&unit(4, 0), 5).unwrap();
    assert_eq!(knn.len(), 1);
    assert_eq!(knn[0].0, id);
    assert!(knn[0].1.abs() < 1e-5, "identical vector has ~zero distance");

    let fts = engine.fts_candidates("bcrypt", None, 10).unwrap();
    assert_eq!(fts, vec![id]);
}

#[test]
fn delete_removes_all_three_rows() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    let id = engine
        .insert(make_record("transient fact", unit(4, 1)))
        .unwrap();

    assert!(engine.delete(&id).unwrap());
    assert_eq!(engine.count(None).unwrap(), 0);
    assert!(engine.knn_candidates(&unit(4, 1), 5).unwrap().is_empty());
    assert!(engine.fts_candidates("transient", None, 10).unwrap().is_empty());

    // Second delete reports absence.
    assert!(!engine.delete(&id).unwrap());
}

#[test]
fn colliding_id_is_regenerated() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    let mut a = make_record("first", unit(4, 0));
    a.id = "mem_1_fixed0000".to_string();
    let mut b = make_record("second", unit(4, 1));
    b.id = "mem_1_fixed0000".to_string();

    let id_a = engine.insert(a).unwrap();
    let id_b = engine.insert(b).unwrap();
    assert_eq!(id_a, "mem_1_fixed0000");
    assert_ne!(id_b, id_a, "collision resolved with a fresh id");
    assert_eq!(engine.count(None).unwrap(), 2);
}

#[test]
fn insert_rejects_wrong_width() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    let err = engine
        .insert(make_record("short vector", vec![1.0, 0.0]))
        .unwrap_err();
    assert!(matches!(
        err,
        MemoError::Storage(StorageError::DimensionMismatch { expected: 4, actual: 2 })
    ));
    assert_eq!(engine.count(None).unwrap(), 0);
}

#[test]
fn replace_by_source_is_a_full_snapshot() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    let tag = container().as_tag();

    let with_source = |content: &str, axis: usize, key: &str| {
        let mut r = make_record(content, unit(4, axis));
        r.source_key = Some(key.to_string());
        r
    };

    // First import: 3 chunks from /doc.md, 1 from /other.md.
    let first: Vec<_> = (0..3)
        .map(|i| with_source(&format!("doc chunk {i}"), i, "/doc.md"))
        .collect();
    let outcome = engine.replace_by_source(&tag, "/doc.md", first).unwrap();
    assert_eq!((outcome.deleted, outcome.inserted), (0, 3));
    engine
        .replace_by_source(&tag, "/other.md", vec![with_source("other", 3, "/other.md")])
        .unwrap();

    let before: Vec<String> = engine
        .list(Some(&tag), -1)
        .unwrap()
        .iter()
        .filter(|r| r.source_key.as_deref() == Some("/doc.md"))
        .map(|r| r.id.clone())
        .collect();

    // Second import: the file now yields 2 chunks.
    let second: Vec<_> = (0..2)
        .map(|i| with_source(&format!("rewritten chunk {i}"), i, "/doc.md"))
        .collect();
    let outcome = engine.replace_by_source(&tag, "/doc.md", second).unwrap();
    assert_eq!((outcome.deleted, outcome.inserted), (3, 2));

    assert_eq!(engine.count_by_source(&tag, "/doc.md").unwrap(), 2);
    assert_eq!(engine.count_by_source(&tag, "/other.md").unwrap(), 1);

    // No record of the first import survives.
    let after = engine.list(Some(&tag), -1).unwrap();
    for old_id in before {
        assert!(after.iter().all(|r| r.id != old_id));
    }
}

#[test]
fn list_orders_newest_first_and_negative_limit_is_unlimited() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    for i in 0..5 {
        let mut r = make_record(&format!("entry {i}"), unit(4, i % 4));
        r.created_at = 1000 + i as i64;
        r.updated_at = r.created_at;
        engine.insert(r).unwrap();
    }

    let all = engine.list(None, -1).unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let two = engine.list(None, 2).unwrap();
    assert_eq!(two.len(), 2);
    assert_eq!(two[0].content, "entry 4");
}

#[test]
fn counts_by_container_and_exact_duplicate() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    let other = ContainerTag::named("other").unwrap();

    engine.insert(make_record("shared fact", unit(4, 0))).unwrap();
    engine
        .insert(MemoryRecord::new("shared fact".into(), unit(4, 1), other))
        .unwrap();

    let counts = engine.count_by_container().unwrap();
    assert_eq!(counts.len(), 2);
    assert!(counts.iter().all(|(_, n)| *n == 1));

    // Exact match is per container.
    assert!(engine
        .find_exact_duplicate("shared fact", &container().as_tag())
        .unwrap()
        .is_some());
    assert!(engine
        .find_exact_duplicate("shared fact", "container:absent")
        .unwrap()
        .is_none());
}

#[test]
fn container_tag_resolution() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    let id = engine.insert(make_record("scoped", unit(4, 0))).unwrap();
    assert_eq!(
        engine.get_container_tag(&id).unwrap().as_deref(),
        Some("container:test")
    );
    assert!(engine.get_container_tag("mem_0_missing00").unwrap().is_none());
}

#[test]
fn fts_grammar_error_is_its_own_kind() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    engine
        .insert(make_record("login endpoint requires jwt header", unit(4, 0)))
        .unwrap();

    let err = engine.fts_candidates("\"unbalanced", None, 10).unwrap_err();
    assert!(matches!(
        err,
        MemoError::Storage(StorageError::FullTextQuery { .. })
    ));
}

#[test]
fn reindex_repairs_and_is_idempotent() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    engine.insert(make_record("alpha fact", unit(4, 0))).unwrap();
    engine.insert(make_record("beta fact", unit(4, 1))).unwrap();

    // Consistent store: nothing to do, twice.
    let first = engine.reindex_fulltext().unwrap();
    assert_eq!((first.added, first.removed), (0, 0));
    let second = engine.reindex_fulltext().unwrap();
    assert_eq!((second.added, second.removed), (0, 0));
}

#[test]
fn reindex_restores_missing_and_drops_orphaned_rows() {
    use memo_core::errors::StorageError;
    use memo_storage::connection::StoreConnection;
    use memo_storage::queries::{index_ops, record_ops};
    use memo_storage::schema;

    let config = test_config(4);
    let conn = StoreConnection::open_in_memory(&config).unwrap();
    conn.with_conn(|c| schema::init_schema(c, 4, "test-model"))
        .unwrap();

    let mut kept = make_record("kept fact", unit(4, 0));
    let mut doomed = make_record("doomed fact", unit(4, 1));
    conn.with_conn(|c| record_ops::insert_record(c, &mut kept))
        .unwrap();
    conn.with_conn(|c| record_ops::insert_record(c, &mut doomed))
        .unwrap();

    // Break invariant #1 both ways behind the engine's back.
    conn.with_conn(|c| {
        c.execute(
            "DELETE FROM fts_memories WHERE memory_id = ?1",
            rusqlite::params![kept.id],
        )
        .map_err(|e| {
            MemoError::Storage(StorageError::Sqlite {
                message: e.to_string(),
            })
        })?;
        c.execute(
            "DELETE FROM memories WHERE id = ?1",
            rusqlite::params![doomed.id],
        )
        .map_err(|e| {
            MemoError::Storage(StorageError::Sqlite {
                message: e.to_string(),
            })
        })?;
        Ok(())
    })
    .unwrap();

    let (added, removed) = conn.with_conn(index_ops::reindex_fulltext).unwrap();
    assert_eq!((added, removed), (1, 1));

    // Idempotent: a second pass finds nothing.
    let (added, removed) = conn.with_conn(index_ops::reindex_fulltext).unwrap();
    assert_eq!((added, removed), (0, 0));

    // The kept record is searchable again.
    let hits = conn
        .with_conn(|c| index_ops::fts_candidates(c, "kept", None, 10))
        .unwrap();
    assert_eq!(hits, vec![kept.id.clone()]);
}

#[test]
fn knn_orders_by_distance() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    let near = engine
        .insert(make_record("near", vec![0.8, 0.6, 0.0, 0.0]))
        .unwrap();
    let far = engine.insert(make_record("far", unit(4, 3))).unwrap();

    let knn = engine.knn_candidates(&unit(4, 0), 5).unwrap();
    assert_eq!(knn.len(), 2);
    assert_eq!(knn[0].0, near);
    assert_eq!(knn[1].0, far);
    assert!(knn[0].1 < knn[1].1);
}

#[test]
fn embedding_cache_roundtrip_and_replace() {
    let engine = StoreEngine::open_in_memory(&test_config(4)).unwrap();
    assert!(engine
        .get_cached_embedding("hash1", "model-a")
        .unwrap()
        .is_none());

    engine
        .put_cached_embedding("hash1", "model-a", &[0.5, 0.5, 0.5, 0.5])
        .unwrap();
    assert_eq!(
        engine.get_cached_embedding("hash1", "model-a").unwrap(),
        Some(vec![0.5, 0.5, 0.5, 0.5])
    );

    // Same hash, other model: distinct key.
    assert!(engine
        .get_cached_embedding("hash1", "model-b")
        .unwrap()
        .is_none());

    // Replace on conflict.
    engine
        .put_cached_embedding("hash1", "model-a", &[1.0, 0.0, 0.0, 0.0])
        .unwrap();
    assert_eq!(
        engine.get_cached_embedding("hash1", "model-a").unwrap(),
        Some(vec![1.0, 0.0, 0.0, 0.0])
    );
    assert_eq!(engine.embedding_cache_len().unwrap(), 1);
}

#[test]
fn file_backed_store_survives_reopen_and_pins_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join(".memo/memo.db");

    let id = {
        let engine = StoreEngine::open(&db, &test_config(4)).unwrap();
        let id = engine.insert(make_record("durable fact", unit(4, 2))).unwrap();
        engine.close().unwrap();
        id
    };

    {
        let engine = StoreEngine::open(&db, &test_config(4)).unwrap();
        assert_eq!(engine.count(None).unwrap(), 1);
        let got = engine.get_record(&id).unwrap().unwrap();
        assert_eq!(got.content, "durable fact");
    }

    // A different configured width must be refused.
    let err = StoreEngine::open(&db, &test_config(8)).unwrap_err();
    assert!(matches!(
        err,
        MemoError::Storage(StorageError::DimensionMismatch { expected: 4, actual: 8 })
    ));
}

#[test]
fn reset_removes_the_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join(".memo/memo.db");

    let engine = StoreEngine::open(&db, &test_config(4)).unwrap();
    engine.insert(make_record("doomed", unit(4, 0))).unwrap();
    engine.reset().unwrap();
    assert!(!db.exists());

    // Reopen re-initialises an empty store.
    let engine = StoreEngine::open(&db, &test_config(4)).unwrap();
    assert_eq!(engine.count(None).unwrap(), 0);
}
