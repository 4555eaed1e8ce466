/// memo system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix prepended to every text before inference. Symmetric for stored
/// content and queries: identical text must produce an identical vector.
pub const EMBEDDING_PREFIX: &str = "clustering: ";

/// RRF smoothing constant.
pub const RRF_K: u32 = 60;

/// KNN candidate pool is this multiple of the requested limit.
pub const KNN_CANDIDATE_MULTIPLIER: usize = 4;

/// Neighbours examined by the near-duplicate check.
pub const DEDUP_KNN_K: usize = 5;

/// Maximum entries in the in-process L1 embedding cache.
pub const L1_CACHE_CAPACITY: usize = 100;

/// Wall-clock bound on a single inference call.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Attempts at regenerating a colliding record id before failing loudly.
pub const ID_RETRY_ATTEMPTS: usize = 3;

/// Database file location relative to the project root.
pub const DB_RELATIVE_PATH: &str = ".memo/memo.db";

/// Hex characters of the project identity hash kept in the container tag.
pub const PROJECT_HASH_LEN: usize = 16;
