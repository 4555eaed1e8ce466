//! EmbeddingEngine — the cached path from text to vector.
//!
//! Lookup order: L1 (FIFO) → L2 (persistent cache table) → inference.
//! The backend is loaded once per process; concurrent first callers await
//! the same initialisation. Inference runs on a blocking thread under a
//! 30s timeout. L2 write failures are swallowed; L1 writes always land.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use memo_core::constants::{EMBED_TIMEOUT_SECS, L1_CACHE_CAPACITY};
use memo_core::errors::EmbeddingError;
use memo_core::{MemoConfig, MemoResult};
use memo_storage::StoreEngine;

use crate::backend::EmbeddingBackend;
use crate::l1::L1Cache;
use crate::onnx::OnnxBackend;
use crate::{content_hash, prefixed};

type BackendFactory = Box<dyn Fn() -> MemoResult<Arc<dyn EmbeddingBackend>> + Send + Sync>;

/// The embedding engine. One per process; see [`global`].
pub struct EmbeddingEngine {
    model_id: String,
    dimensions: usize,
    timeout: Duration,
    factory: BackendFactory,
    backend: OnceCell<Arc<dyn EmbeddingBackend>>,
    l1: Mutex<L1Cache>,
}

impl EmbeddingEngine {
    /// Engine for the configured ONNX model. Loading is deferred to the
    /// first embed call.
    pub fn new(config: &MemoConfig) -> Self {
        let model_dir = OnnxBackend::model_dir(&config.storage_path, &config.embedding_model);
        let model_id = config.embedding_model.clone();
        let dimensions = config.embedding_dimensions;
        let factory_model_id = model_id.clone();
        Self::with_factory(
            model_id,
            dimensions,
            Duration::from_secs(EMBED_TIMEOUT_SECS),
            Box::new(move || {
                let backend = OnnxBackend::load(&model_dir, &factory_model_id, dimensions)?;
                Ok(Arc::new(backend) as Arc<dyn EmbeddingBackend>)
            }),
        )
    }

    /// Engine over an already constructed backend (tests, fallback).
    pub fn with_backend(backend: Arc<dyn EmbeddingBackend>) -> Self {
        let model_id = backend.model_id().to_string();
        let dimensions = backend.dimensions();
        Self::with_factory(
            model_id,
            dimensions,
            Duration::from_secs(EMBED_TIMEOUT_SECS),
            Box::new(move || Ok(backend.clone())),
        )
    }

    /// Fully parameterised constructor; the factory runs at most once.
    pub fn with_factory(
        model_id: String,
        dimensions: usize,
        timeout: Duration,
        factory: BackendFactory,
    ) -> Self {
        Self {
            model_id,
            dimensions,
            timeout,
            factory,
            backend: OnceCell::new(),
            l1: Mutex::new(L1Cache::new(L1_CACHE_CAPACITY)),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a text. The same prefix is applied to stored content and
    /// queries, so identical text yields an identical vector.
    pub async fn embed(&self, store: &StoreEngine, text: &str) -> MemoResult<Vec<f32>> {
        let key = prefixed(text);

        if let Some(vector) = self.l1_get(&key) {
            return Ok(vector);
        }

        let hash = content_hash(&key);
        if let Some(vector) = store.get_cached_embedding(&hash, &self.model_id)? {
            debug!(hash = %hash, "L2 cache hit");
            self.l1_put(key, vector.clone());
            return Ok(vector);
        }

        let backend = self.backend().await?;
        let infer_key = key.clone();
        let task = tokio::task::spawn_blocking(move || backend.embed(&infer_key));
        let vector = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                return Err(EmbeddingError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
                .into())
            }
            Ok(join) => join.map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("inference task failed: {e}"),
            })??,
        };

        if vector.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            }
            .into());
        }

        self.l1_put(key, vector.clone());
        if let Err(e) = store.put_cached_embedding(&hash, &self.model_id, &vector) {
            warn!(error = %e, "L2 cache write failed; continuing");
        }
        Ok(vector)
    }

    /// The loaded backend; first caller triggers the load, concurrent
    /// callers await the same initialisation. A width mismatch between the
    /// backend and the configured dimension is fatal.
    async fn backend(&self) -> MemoResult<Arc<dyn EmbeddingBackend>> {
        self.backend
            .get_or_try_init(|| async {
                let backend = (self.factory)()?;
                if backend.dimensions() != self.dimensions {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.dimensions,
                        actual: backend.dimensions(),
                    }
                    .into());
                }
                debug!(model = backend.model_id(), dims = backend.dimensions(),
                       "embedding backend initialised");
                Ok(backend)
            })
            .await
            .cloned()
    }

    fn l1_get(&self, key: &str) -> Option<Vec<f32>> {
        self.l1.lock().ok().and_then(|cache| cache.get(key))
    }

    fn l1_put(&self, key: String, vector: Vec<f32>) {
        if let Ok(mut cache) = self.l1.lock() {
            cache.insert(key, vector);
        }
    }
}

static GLOBAL: Mutex<Option<Arc<EmbeddingEngine>>> = Mutex::new(None);

/// The process-wide engine. Constructed lazily from the given config on
/// first use; later calls return the same instance regardless of config.
pub fn global(config: &MemoConfig) -> Arc<EmbeddingEngine> {
    let mut slot = GLOBAL.lock().expect("embedding singleton lock");
    slot.get_or_insert_with(|| Arc::new(EmbeddingEngine::new(config)))
        .clone()
}

/// Drop the process-wide engine so tests can start fresh.
pub fn reset_global() {
    let mut slot = GLOBAL.lock().expect("embedding singleton lock");
    *slot = None;
}
