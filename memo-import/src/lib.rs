//! # memo-import
//!
//! Turns a markdown file/tree or a JSON repo map into a deterministic set
//! of records keyed by a stable source key, then hands each source's
//! records to the store's transactional replace-by-source protocol.
//! Re-importing a source is a full-snapshot replacement, never an append.

pub mod chunker;
pub mod importer;
pub mod repo_map;

pub use chunker::{chunk_lines, Chunk, ChunkerConfig};
pub use importer::{ImportOutcome, Importer};
pub use repo_map::{parse_repo_map, RepoMapEntry};
