//! # memo-identity
//!
//! Resolves where a project's store lives and which container its records
//! belong to. The identity string is the VCS common directory when one is
//! discoverable, so all worktrees of a repository share one container and
//! one database file; otherwise the working directory stands in.

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::debug;

use memo_core::constants::DB_RELATIVE_PATH;
use memo_core::ContainerTag;

/// Resolved project identity.
#[derive(Debug, Clone)]
pub struct ProjectIdentity {
    /// Worktree-stable identity string the container hash is derived from.
    pub identity: String,
    /// Directory the `.memo/` store lives under.
    pub project_root: PathBuf,
    /// Whether a VCS repository was discovered.
    pub from_vcs: bool,
}

impl ProjectIdentity {
    /// Discover the identity for a working directory.
    pub fn discover(cwd: &Path) -> Self {
        match Repository::discover(cwd) {
            Ok(repo) => {
                // commondir is shared across worktrees; its parent is the
                // main checkout root.
                let common = canonical(repo.commondir());
                let root = common
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| cwd.to_path_buf());
                debug!(common = %common.display(), "project identity from VCS");
                Self {
                    identity: path_string(&common),
                    project_root: root,
                    from_vcs: true,
                }
            }
            Err(e) => {
                let dir = canonical(cwd);
                debug!(error = %e, dir = %dir.display(), "no VCS repository; using cwd");
                Self {
                    identity: path_string(&dir),
                    project_root: dir.clone(),
                    from_vcs: false,
                }
            }
        }
    }

    /// The project-scoped container tag.
    pub fn container_tag(&self) -> ContainerTag {
        ContainerTag::from_project_identity(&self.identity)
    }

    /// `<project-root>/.memo/memo.db`.
    pub fn db_path(&self) -> PathBuf {
        self.project_root.join(DB_RELATIVE_PATH)
    }
}

/// Best-effort provenance attributes stamped onto inserted records.
/// Absence of any field is non-fatal.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    pub display_name: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub project_path: Option<String>,
    pub project_name: Option<String>,
    pub git_repo_url: Option<String>,
}

impl Provenance {
    /// Gather provenance for a working directory.
    pub fn gather(cwd: &Path, identity: &ProjectIdentity) -> Self {
        let mut p = Provenance {
            display_name: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .ok(),
            project_path: Some(path_string(&identity.project_root)),
            project_name: identity
                .project_root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            ..Default::default()
        };
        if let Ok(repo) = Repository::discover(cwd) {
            if let Ok(config) = repo.config() {
                p.user_name = config.get_string("user.name").ok();
                p.user_email = config.get_string("user.email").ok();
            }
            if let Ok(remote) = repo.find_remote("origin") {
                p.git_repo_url = remote.url().map(str::to_string);
            }
        }
        p
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
