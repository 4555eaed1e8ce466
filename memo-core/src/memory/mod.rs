//! The stored record type and its metadata carrier.

mod metadata;

pub use metadata::{MarkdownChunkMeta, RecordMetadata, RepoMapMeta};

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::container::ContainerTag;

/// Record type discriminator for imported document chunks.
pub const RECORD_TYPE_DOC_CHUNK: &str = "doc_chunk";

/// The atomic stored unit. Records are immutable once written; updates are
/// delete + insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// `mem_{millis}_{9-char base36 nonce}`.
    pub id: String,
    /// Post privacy-strip content, stored verbatim.
    pub content: String,
    /// Unit-length embedding of the prefixed content.
    pub vector: Vec<f32>,
    /// Scope this record belongs to. Immutable.
    pub container_tag: ContainerTag,
    /// Stable identifier of the import source, when imported.
    pub source_key: Option<String>,
    /// `"doc_chunk"` for imported records, absent for user-added ones.
    pub record_type: Option<String>,
    /// Opaque JSON text at the store level; see [`RecordMetadata`].
    pub metadata: Option<String>,
    /// Millisecond timestamps.
    pub created_at: i64,
    pub updated_at: i64,
    // Provenance, captured at insert. Best-effort, absence is fine.
    pub display_name: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub project_path: Option<String>,
    pub project_name: Option<String>,
    pub git_repo_url: Option<String>,
}

impl MemoryRecord {
    /// Build a bare record with a fresh id and current timestamps.
    pub fn new(content: String, vector: Vec<f32>, container_tag: ContainerTag) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: new_record_id(),
            content,
            vector,
            container_tag,
            source_key: None,
            record_type: None,
            metadata: None,
            created_at: now,
            updated_at: now,
            display_name: None,
            user_name: None,
            user_email: None,
            project_path: None,
            project_name: None,
            git_repo_url: None,
        }
    }

    /// Replace the id with a freshly generated one. Used when an insert hits
    /// a primary-key collision (same-millisecond nonce clash).
    pub fn regenerate_id(&mut self) {
        self.id = new_record_id();
    }

    /// Parse the opaque metadata text into its typed form.
    pub fn parsed_metadata(&self) -> Option<RecordMetadata> {
        self.metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok())
    }
}

/// Generate a record id: `mem_{decimalMillis}_{9-char base36 nonce}`.
pub fn new_record_id() -> String {
    let millis = Utc::now().timestamp_millis();
    format!("mem_{millis}_{}", base36_nonce(9))
}

/// Random base36 string of the given length.
fn base36_nonce(len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
