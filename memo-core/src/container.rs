//! Container tags: the scope identifier every record carries.
//!
//! Two shapes: `project:<H>` where H is the first 16 hex chars of the
//! SHA-256 of the worktree-stable project identity string, and
//! `container:<slug>` for user-named scopes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::PROJECT_HASH_LEN;
use crate::errors::{MemoError, MemoResult};

/// A record scope. Stored and compared as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContainerTag {
    /// `project:<16-hex>` — derived from the project identity.
    Project(String),
    /// `container:<slug>` — user-named.
    Named(String),
}

impl ContainerTag {
    /// Derive the project tag from the identity string (the VCS common
    /// directory when available, otherwise the working directory).
    pub fn from_project_identity(identity: &str) -> Self {
        let digest = Sha256::digest(identity.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        ContainerTag::Project(hex[..PROJECT_HASH_LEN].to_string())
    }

    /// Build a named tag. The label is slugified; an empty slug is refused.
    pub fn named(label: &str) -> MemoResult<Self> {
        let slug = slugify(label);
        if slug.is_empty() {
            return Err(MemoError::InvalidInput(format!(
                "container name {label:?} slugifies to nothing"
            )));
        }
        Ok(ContainerTag::Named(slug))
    }

    /// The string form stored in the database.
    pub fn as_tag(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContainerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerTag::Project(h) => write!(f, "project:{h}"),
            ContainerTag::Named(s) => write!(f, "container:{s}"),
        }
    }
}

impl FromStr for ContainerTag {
    type Err = MemoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hash) = s.strip_prefix("project:") {
            if !hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit()) {
                return Ok(ContainerTag::Project(hash.to_string()));
            }
        }
        if let Some(slug) = s.strip_prefix("container:") {
            if !slug.is_empty() && slug == slugify(slug) {
                return Ok(ContainerTag::Named(slug.to_string()));
            }
        }
        Err(MemoError::InvalidInput(format!(
            "malformed container tag {s:?}"
        )))
    }
}

impl TryFrom<String> for ContainerTag {
    type Error = MemoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ContainerTag> for String {
    fn from(tag: ContainerTag) -> Self {
        tag.to_string()
    }
}

/// Lower-case, collapse every non-`[a-z0-9]` run to a single `-`, trim
/// outer `-`. Idempotent.
pub fn slugify(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_dash = false;
    for c in label.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}
