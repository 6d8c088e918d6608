//! git::sync
//!
//! Remote synchronization: remotes, fetch, fast-forward-only pull, push
//! with automatic rollback on denied pushes, and ahead/behind counting.
//!
//! # Fast-forward-only policy
//!
//! `pull` never performs a true three-way merge. Merge analysis yields one
//! of three handled outcomes, in priority order:
//!
//! 1. **Up to date**: no-op.
//! 2. **Fast-forward**: check out the remote commit's tree, move (or
//!    create) the local branch pointer, then set HEAD. The working tree is
//!    only touched after all network I/O has completed, so a timeout never
//!    leaves a half-written checkout.
//! 3. **Divergent**: [`GitError::MergeUnavailable`]; resolving the
//!    conflict is an administrator workflow, never automatic.
//!
//! Any other analysis result indicates a git2-layer contract change and is
//! surfaced as [`GitError::Internal`].
//!
//! # Denied pushes
//!
//! A push whose failure translates to [`GitError::Forbidden`] hard-resets
//! the local branch to the corresponding remote-tracking ref before the
//! error is raised: a denied push must never leave the local repository
//! diverged from what the user is authorized to see.

use tracing::{debug, warn};

use super::errors::{translate, GitError};
use super::repository::GitRepository;

/// Conventional remote name used by the workspace layer.
pub const DEFAULT_REMOTE: &str = "origin";

/// What `pull` does when the remote-tracking branch does not exist after
/// fetching.
///
/// A freshly-initialized repository legitimately has nothing to merge yet
/// ([`Ignore`](MissingBranch::Ignore)); a repository that already has
/// history and expects to reconcile against the remote should treat the
/// absence as a misconfiguration ([`Error`](MissingBranch::Error)). The
/// policy is always chosen explicitly by the caller, never inferred from
/// call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingBranch {
    /// Succeed as a no-op (new-repository case).
    Ignore,
    /// Raise [`GitError::BranchNotFound`].
    Error,
}

impl GitRepository {
    /// Look up a remote by name.
    ///
    /// # Errors
    ///
    /// - [`GitError::RemoteNotFound`] if no remote has this name
    fn find_remote(&self, name: &str) -> Result<git2::Remote<'_>, GitError> {
        self.repo.find_remote(name).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec => GitError::RemoteNotFound {
                name: name.to_string(),
            },
            _ => GitError::from_git2(e, name),
        })
    }

    /// Associate `name` with `url`, failing if the name is already bound.
    ///
    /// # Errors
    ///
    /// - [`GitError::RemoteDuplicate`] if a remote named `name` exists
    pub fn create_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.repo.remote(name, url).map_err(|e| match e.code() {
            git2::ErrorCode::Exists => GitError::RemoteDuplicate {
                name: name.to_string(),
            },
            _ => GitError::from_git2(e, name),
        })?;
        Ok(())
    }

    /// Associate `name` with `url`, rebinding the URL if the name is
    /// already taken. Always succeeds barring I/O failure.
    pub fn set_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        match self.create_remote(name, url) {
            Ok(()) => Ok(()),
            Err(GitError::RemoteDuplicate { .. }) => {
                self.repo
                    .remote_set_url(name, url)
                    .map_err(|e| GitError::from_git2(e, name))?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Idempotently ensure `name` points at `url`.
    ///
    /// A no-op when the remote already exists with this URL; otherwise
    /// equivalent to [`set_remote`](Self::set_remote).
    pub fn ensure_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        if let Ok(remote) = self.repo.find_remote(name) {
            if remote.url() == Some(url) {
                return Ok(());
            }
        }
        self.set_remote(name, url)
    }

    /// URL of a named remote, if configured.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, name)),
        }
    }

    /// Fetch from a named remote using the injected credentials.
    ///
    /// Transport failures are routed through [`translate`] before being
    /// raised, so a server-side denial surfaces as [`GitError::Forbidden`].
    pub fn fetch(&self, remote_name: &str) -> Result<(), GitError> {
        let mut remote = self.find_remote(remote_name)?;

        let mut options = git2::FetchOptions::new();
        if let Some(credentials) = &self.credentials {
            options.remote_callbacks(credentials.callbacks());
        }

        debug!(remote = remote_name, "fetching");
        remote
            .fetch(&[] as &[&str], Some(&mut options), None)
            .map_err(translate)
    }

    /// Fetch and fast-forward the named branch to the remote tip.
    ///
    /// A missing remote-tracking branch succeeds as a no-op (the
    /// new-repository case). Use [`pull_with`](Self::pull_with) to make
    /// that condition an error instead.
    pub fn pull(&self, remote_name: &str, branch_name: &str) -> Result<(), GitError> {
        self.pull_with(remote_name, branch_name, MissingBranch::Ignore)
    }

    /// Fetch and fast-forward with an explicit missing-branch policy.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchNotFound`] under [`MissingBranch::Error`] when
    ///   the remote-tracking branch does not exist after the fetch
    /// - [`GitError::MergeUnavailable`] when histories have diverged
    /// - [`GitError::Forbidden`] when the remote denies the fetch
    pub fn pull_with(
        &self,
        remote_name: &str,
        branch_name: &str,
        missing: MissingBranch,
    ) -> Result<(), GitError> {
        self.fetch(remote_name)?;

        let remote_ref = format!("refs/remotes/{remote_name}/{branch_name}");
        let remote_oid = match self.repo.find_reference(&remote_ref) {
            Ok(reference) => reference.target().ok_or_else(|| GitError::Internal {
                message: format!("{remote_ref} has no target"),
            })?,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                // Remote branch doesn't exist yet; on a new repository
                // there is nothing to merge.
                return match missing {
                    MissingBranch::Ignore => {
                        debug!(remote = remote_name, branch = branch_name, "no remote branch, nothing to pull");
                        Ok(())
                    }
                    MissingBranch::Error => Err(GitError::BranchNotFound {
                        name: branch_name.to_string(),
                    }),
                };
            }
            Err(e) => return Err(GitError::from_git2(e, &remote_ref)),
        };

        let annotated = self
            .repo
            .find_annotated_commit(remote_oid)
            .map_err(|e| GitError::from_git2(e, &remote_ref))?;
        let (analysis, _) = self.repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            debug!(remote = remote_name, branch = branch_name, "already up to date");
            return Ok(());
        }

        if analysis.is_fast_forward() {
            let remote_commit = self
                .repo
                .find_commit(remote_oid)
                .map_err(|e| GitError::from_git2(e, &remote_ref))?;

            // Checkout, then branch move, then HEAD, in that order: the
            // working tree is written as one final local step after all
            // network I/O is done.
            self.repo.checkout_tree(remote_commit.as_object(), None)?;

            match self.repo.find_branch(branch_name, git2::BranchType::Local) {
                Ok(branch) => {
                    let mut reference = branch.into_reference();
                    reference.set_target(remote_oid, "pull: fast-forward")?;
                }
                Err(e) if e.code() == git2::ErrorCode::NotFound => {
                    self.repo.branch(branch_name, &remote_commit, false)?;
                }
                Err(e) => return Err(GitError::from_git2(e, branch_name)),
            }

            self.repo.set_head(&format!("refs/heads/{branch_name}"))?;

            debug!(
                remote = remote_name,
                branch = branch_name,
                target = %remote_oid,
                "fast-forwarded"
            );
            return Ok(());
        }

        if analysis.is_normal() {
            // True three-way merges require manual intervention.
            return Err(GitError::MergeUnavailable);
        }

        Err(GitError::Internal {
            message: format!("unexpected merge analysis result: {analysis:?}"),
        })
    }

    /// Push the named local branch to a remote.
    ///
    /// If the failure translates to [`GitError::Forbidden`], the local
    /// branch is hard-reset to the remote-tracking ref, discarding the
    /// rejected commits, before the error is raised.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchNotFound`] if the local branch does not exist
    /// - [`GitError::Forbidden`] when the remote denies the push
    pub fn push(&self, remote_name: &str, branch_name: &str) -> Result<(), GitError> {
        // Resolve the branch up front so a missing branch is reported as
        // such rather than as an opaque refspec failure.
        self.get_branch(branch_name)?;

        let mut remote = self.find_remote(remote_name)?;

        let mut options = git2::PushOptions::new();
        if let Some(credentials) = &self.credentials {
            options.remote_callbacks(credentials.callbacks());
        }

        let refspec = format!("refs/heads/{branch_name}");
        debug!(remote = remote_name, branch = branch_name, "pushing");

        match remote.push(&[refspec.as_str()], Some(&mut options)) {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = translate(e);
                if matches!(err, GitError::Forbidden) {
                    warn!(
                        remote = remote_name,
                        branch = branch_name,
                        "push denied, discarding local commits"
                    );
                    if let Err(reset_err) = self.discard_to_remote(remote_name, branch_name) {
                        warn!(error = %reset_err, "rollback after denied push failed");
                    }
                }
                Err(err)
            }
        }
    }

    /// Hard-reset the working copy to the remote-tracking ref of the named
    /// branch, discarding local-only commits and modifications.
    ///
    /// This is the rollback `push` performs after a denied push.
    pub fn discard_to_remote(&self, remote_name: &str, branch_name: &str) -> Result<(), GitError> {
        self.reset_hard(&format!("refs/remotes/{remote_name}/{branch_name}"))
    }

    /// Fetch, then count commits unique to each side of local HEAD versus
    /// the remote-tracking branch, as `(ahead, behind)`.
    ///
    /// An unborn local HEAD has nothing of its own, so it reports
    /// `(0, behind)` where `behind` is the full remote history.
    pub fn ahead_behind(
        &self,
        remote_name: &str,
        branch_name: &str,
    ) -> Result<(usize, usize), GitError> {
        self.fetch(remote_name)?;

        let remote_ref = format!("refs/remotes/{remote_name}/{branch_name}");
        let upstream = self
            .repo
            .revparse_single(&remote_ref)
            .map_err(|e| match e.code() {
                git2::ErrorCode::NotFound => GitError::BranchNotFound {
                    name: branch_name.to_string(),
                },
                _ => GitError::from_git2(e, &remote_ref),
            })?
            .id();

        match self.head_oid()? {
            Some(local) => self
                .repo
                .graph_ahead_behind(local, upstream)
                .map_err(Into::into),
            None => {
                let mut walk = self.repo.revwalk()?;
                walk.push(upstream)
                    .map_err(|e| GitError::from_git2(e, &remote_ref))?;
                let mut behind = 0;
                for commit in walk {
                    commit.map_err(|e| GitError::from_git2(e, &remote_ref))?;
                    behind += 1;
                }
                Ok((0, behind))
            }
        }
    }
}
