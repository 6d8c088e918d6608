//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the only doorway to Git. All repository reads and writes
//! flow through [`GitRepository`]; no other module imports `git2` directly.
//!
//! # Responsibilities
//!
//! - Repository discovery, opening, and initialization
//! - Staging, commits, branches, hard resets
//! - Remote management, fetch, fast-forward-only pull, push
//! - Rollback of local commits after a denied push
//! - Translation of free-text transport failures into typed errors
//!
//! # Invariants
//!
//! - Pulls are fast-forward only; divergent histories are never merged
//!   automatically ([`GitError::MergeUnavailable`])
//! - A push translated to [`GitError::Forbidden`] resets the local branch
//!   to the remote-tracking ref before the error is raised
//! - All network I/O is blocking and routed through the injected
//!   [`Credentials`]
//!
//! # Example
//!
//! ```ignore
//! use gitwarden::git::{Credentials, GitRepository, MissingBranch, DEFAULT_REMOTE};
//! use std::path::Path;
//!
//! let (mut repo, fresh) = GitRepository::open_or_init(Path::new("/srv/ws/alice/admin"))?;
//! repo.set_credentials(Credentials::new("alice", token));
//! repo.ensure_remote(DEFAULT_REMOTE, "https://git.example.com/gitolite-admin")?;
//!
//! let policy = if fresh { MissingBranch::Ignore } else { MissingBranch::Error };
//! repo.pull_with(DEFAULT_REMOTE, "master", policy)?;
//! ```

mod credentials;
mod errors;
mod repository;
mod sync;

pub use credentials::Credentials;
pub use errors::{translate, GitError};
pub use repository::GitRepository;
pub use sync::{MissingBranch, DEFAULT_REMOTE};
