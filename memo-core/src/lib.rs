//! # memo-core
//!
//! Foundation crate for the memo memory store.
//! Defines record types, container tags, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod container;
pub mod errors;
pub mod memory;

// Re-export the most commonly used types at the crate root.
pub use config::MemoConfig;
pub use container::ContainerTag;
pub use errors::{MemoError, MemoResult};
pub use memory::{MemoryRecord, RecordMetadata};
