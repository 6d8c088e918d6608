//! workspace
//!
//! Per-user repository materialization.
//!
//! # Overview
//!
//! Every authenticated user works against private clones under
//! `<workspace_dir>/<user>/`. For each request the workspace layer
//! materializes the repository the request needs: open-or-init the local
//! copy, inject the user's credentials, idempotently bind the `origin`
//! remote, and pull with an explicit missing-branch policy. Isolation
//! between users is filesystem namespacing, not locking; requests racing
//! on the *same* user+resource pair must hold a [`ResourceLock`].
//!
//! # Missing-branch policy
//!
//! A repository this layer just initialized has nothing to reconcile, so
//! a missing remote branch is ignored. A repository that was opened with
//! existing history expects the remote branch to exist; its absence is a
//! misconfiguration surfaced as [`GitError::BranchNotFound`]
//! (HTTP 503 at the caller).

mod lock;

pub use lock::{LockError, ResourceLock};

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::Settings;
use crate::git::{Credentials, GitError, GitRepository, MissingBranch, DEFAULT_REMOTE};
use crate::gitolite::{AdminError, AdminRepository};

/// Errors from workspace operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The computed per-user path escaped the workspace root.
    #[error("unsafe workspace path: {path}")]
    UnsafePath {
        /// The rejected path
        path: PathBuf,
    },

    /// Failed to provision the local directory.
    #[error("failed to create workspace directory '{path}': {source}")]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Join path segments onto a base URL, normalizing slashes.
///
/// ```
/// use gitwarden::workspace::join_url;
///
/// assert_eq!(
///     join_url("https://git.example.com/", ["projects/", "demo"]),
///     "https://git.example.com/projects/demo"
/// );
/// ```
pub fn join_url<'a>(base: &str, segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        for part in segment.split('/').filter(|p| !p.is_empty()) {
            url.push('/');
            url.push_str(part);
        }
    }
    url
}

/// Whether `path`, interpreted lexically, stays under `base`.
///
/// Rejects any `..` or absolute component so a hostile name computed into
/// a path can never traverse out of the workspace root.
pub fn is_safe_path(base: &Path, path: &Path) -> bool {
    let relative = match path.strip_prefix(base) {
        Ok(rel) => rel,
        Err(_) => return false,
    };
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

/// The per-user workspace layer.
#[derive(Debug, Clone)]
pub struct Workspace {
    settings: Settings,
}

impl Workspace {
    /// Create a workspace over the given settings.
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// The settings this workspace was built from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The private directory of one user.
    ///
    /// # Errors
    ///
    /// - [`WorkspaceError::UnsafePath`] if the user name would traverse
    ///   out of the workspace root
    pub fn user_dir(&self, user: &str) -> Result<PathBuf, WorkspaceError> {
        let dir = self.settings.workspace_dir.join(user);
        if !is_safe_path(&self.settings.workspace_dir, &dir) {
            return Err(WorkspaceError::UnsafePath { path: dir });
        }
        Ok(dir)
    }

    /// Lock-file path for one (user, resource) pair.
    fn lock_path(&self, user: &str, resource: &str) -> Result<PathBuf, WorkspaceError> {
        let name = format!("{}.lock", resource.replace('/', "__"));
        Ok(self.user_dir(user)?.join(".locks").join(name))
    }

    /// Acquire the exclusive lock for one (user, resource) pair.
    ///
    /// Hold the returned guard for the duration of the request.
    pub fn lock(&self, user: &str, resource: &str) -> Result<ResourceLock, WorkspaceError> {
        Ok(ResourceLock::acquire(&self.lock_path(user, resource)?)?)
    }

    /// Materialize a repository at `local`, synchronized with `remote_url`.
    ///
    /// Open-or-init, inject credentials, ensure the `origin` remote, pull.
    /// A freshly-initialized (or still-empty) local copy tolerates a
    /// missing remote branch; one with existing history does not.
    fn materialize_at(
        &self,
        local: &Path,
        remote_url: &str,
        credentials: Credentials,
    ) -> Result<GitRepository, WorkspaceError> {
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent).map_err(|source| WorkspaceError::CreateFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let (mut repo, fresh) = GitRepository::open_or_init(local)?;
        repo.set_credentials(credentials);
        repo.ensure_remote(DEFAULT_REMOTE, remote_url)?;

        let policy = if fresh || repo.is_empty()? {
            MissingBranch::Ignore
        } else {
            MissingBranch::Error
        };

        debug!(local = %local.display(), remote = remote_url, fresh, "materializing repository");
        repo.pull_with(DEFAULT_REMOTE, &self.settings.default_branch, policy)?;

        Ok(repo)
    }

    /// Materialize the user's copy of the Gitolite admin repository and
    /// load its configuration.
    pub fn admin(
        &self,
        user: &str,
        credentials: Credentials,
    ) -> Result<AdminRepository, WorkspaceError> {
        let local = self.user_dir(user)?.join("admin");
        let remote = join_url(&self.settings.remote_url, [self.settings.admin_repository.as_str()]);

        let repo = self.materialize_at(&local, &remote, credentials)?;
        Ok(AdminRepository::load(repo)?)
    }

    /// Materialize the user's copy of a project repository.
    pub fn project(
        &self,
        user: &str,
        name: &str,
        credentials: Credentials,
    ) -> Result<GitRepository, WorkspaceError> {
        self.named(user, &self.settings.projects_prefix, name, credentials)
    }

    /// Materialize the user's copy of a template repository.
    pub fn template(
        &self,
        user: &str,
        name: &str,
        credentials: Credentials,
    ) -> Result<GitRepository, WorkspaceError> {
        self.named(user, &self.settings.templates_prefix, name, credentials)
    }

    fn named(
        &self,
        user: &str,
        prefix: &str,
        name: &str,
        credentials: Credentials,
    ) -> Result<GitRepository, WorkspaceError> {
        let user_dir = self.user_dir(user)?;
        let local = user_dir.join(prefix).join(name);
        if !is_safe_path(&user_dir, &local) {
            return Err(WorkspaceError::UnsafePath { path: local });
        }

        let remote = join_url(&self.settings.remote_url, [prefix, name]);
        self.materialize_at(&local, &remote, credentials)
    }
}
