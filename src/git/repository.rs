//! git::repository
//!
//! Local repository operations: open/initialize, staging, commits,
//! branches, and hard resets.
//!
//! # Architecture
//!
//! [`GitRepository`] is the single doorway to a working copy. It is
//! constructed already bound to an on-disk Git store ([`GitRepository::open`]
//! discovers an existing store, [`GitRepository::init`] creates a fresh one),
//! so an "unopened handle" cannot exist and misuse is impossible by
//! construction.
//!
//! Every operation in this module touches only the local filesystem and
//! object store; network I/O lives in [`crate::git::sync`].

use std::path::{Path, PathBuf};

use super::credentials::Credentials;
use super::errors::GitError;

/// A local Git working copy.
///
/// Owns the underlying git2 repository handle, an optional injected
/// [`Credentials`] used for every remote operation, and an optional cached
/// author identity used when a commit does not name one explicitly.
///
/// # Example
///
/// ```no_run
/// use gitwarden::git::GitRepository;
/// use std::path::Path;
///
/// let repo = GitRepository::open(Path::new("/srv/workspace/alice/admin"))?;
/// repo.add_file(Path::new("conf/gitolite.conf"))?;
/// repo.commit("Updated project 'demo'", None, None)?;
/// # Ok::<(), gitwarden::git::GitError>(())
/// ```
pub struct GitRepository {
    /// The underlying git2 repository
    pub(super) repo: git2::Repository,
    /// Credentials answering remote authentication callbacks
    pub(super) credentials: Option<Credentials>,
    /// Cached author identity (name, email) for commits
    signature: Option<(String, String)>,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl GitRepository {
    /// Open the repository discoverable from `path`.
    ///
    /// Searches ancestor directories exactly as a working tree would.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is discoverable
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        Ok(Self {
            repo,
            credentials: None,
            signature: None,
        })
    }

    /// Create a new, empty repository at `path`.
    pub fn init(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::init(path)
            .map_err(|e| GitError::from_git2(e, &path.display().to_string()))?;

        Ok(Self {
            repo,
            credentials: None,
            signature: None,
        })
    }

    /// Open the repository at `path`, initializing a fresh one if none is
    /// discoverable.
    ///
    /// Returns the handle and whether an initialization took place.
    pub fn open_or_init(path: &Path) -> Result<(Self, bool), GitError> {
        match Self::open(path) {
            Ok(repo) => Ok((repo, false)),
            Err(GitError::NotARepo { .. }) => Ok((Self::init(path)?, true)),
            Err(e) => Err(e),
        }
    }

    /// Inject the credentials used for every subsequent fetch and push.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    /// Cache an author identity used when commits do not name one.
    pub fn set_default_signature(&mut self, name: impl Into<String>, email: impl Into<String>) {
        self.signature = Some((name.into(), email.into()));
    }

    /// Path to the working directory.
    ///
    /// # Errors
    ///
    /// - [`GitError::Internal`] for bare repositories (no working tree)
    pub fn workdir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or_else(|| GitError::Internal {
            message: "repository has no working directory".to_string(),
        })
    }

    /// Resolve an absolute path to a workdir-relative Git path.
    ///
    /// Relative paths are returned unchanged.
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf, GitError> {
        if !path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        let workdir = self.workdir()?;
        path.strip_prefix(workdir)
            .map(Path::to_path_buf)
            .map_err(|_| GitError::Internal {
                message: format!(
                    "path {} is outside working directory {}",
                    path.display(),
                    workdir.display()
                ),
            })
    }

    /// Stage one file. The index is written immediately.
    pub fn add_file(&self, path: &Path) -> Result<(), GitError> {
        let relative = self.resolve_path(path)?;
        let mut index = self.repo.index()?;
        index
            .add_path(&relative)
            .map_err(|e| GitError::from_git2(e, &relative.display().to_string()))?;
        index.write()?;
        Ok(())
    }

    /// Stage several files. The index is written after each one.
    pub fn add_files<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> Result<(), GitError> {
        for path in paths {
            self.add_file(path)?;
        }
        Ok(())
    }

    /// Stage all modified and untracked files.
    pub fn add_all(&self) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index.add_all(["*"], git2::IndexAddOption::DEFAULT, None)?;
        index.write()?;
        Ok(())
    }

    /// Resolve the author identity for a commit.
    ///
    /// Falls back from the caller-set default signature to the store's
    /// configured one.
    ///
    /// # Errors
    ///
    /// - [`GitError::SignatureMissing`] if neither exists
    fn signature(&self) -> Result<git2::Signature<'static>, GitError> {
        if let Some((name, email)) = &self.signature {
            return git2::Signature::now(name, email).map_err(Into::into);
        }

        self.repo
            .signature()
            .map_err(|_| GitError::SignatureMissing)
    }

    /// Write the staged tree as a new commit and advance HEAD.
    ///
    /// If `author` is omitted, the cached default signature (or the store's
    /// own) is used. If `parents` is omitted, the current HEAD is the sole
    /// parent, or no parent at all when HEAD is unborn, the first commit
    /// in an empty repository.
    pub fn commit(
        &self,
        message: &str,
        author: Option<&git2::Signature<'_>>,
        parents: Option<&[git2::Oid]>,
    ) -> Result<git2::Oid, GitError> {
        let default_signature;
        let signature = match author {
            Some(sig) => sig,
            None => {
                default_signature = self.signature()?;
                &default_signature
            }
        };

        let parent_ids: Vec<git2::Oid> = match parents {
            Some(ids) => ids.to_vec(),
            None => match self.head_oid()? {
                Some(oid) => vec![oid],
                None => Vec::new(),
            },
        };

        let mut parent_commits = Vec::with_capacity(parent_ids.len());
        for id in &parent_ids {
            parent_commits.push(
                self.repo
                    .find_commit(*id)
                    .map_err(|e| GitError::from_git2(e, &id.to_string()))?,
            );
        }
        let parent_refs: Vec<&git2::Commit<'_>> = parent_commits.iter().collect();

        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let oid = self.repo.commit(
            Some("HEAD"),
            signature,
            signature,
            message,
            &tree,
            &parent_refs,
        )?;

        Ok(oid)
    }

    /// Stage all changes, then commit them.
    pub fn commit_all(
        &self,
        message: &str,
        author: Option<&git2::Signature<'_>>,
    ) -> Result<git2::Oid, GitError> {
        self.add_all()?;
        self.commit(message, author, None)
    }

    /// Current HEAD commit, or `None` when HEAD is unborn.
    pub fn head_oid(&self) -> Result<Option<git2::Oid>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(
                head.peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, "HEAD"))?
                    .id(),
            )),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, "HEAD")),
        }
    }

    /// Whether the repository has no commits at all.
    pub fn is_empty(&self) -> Result<bool, GitError> {
        self.repo.is_empty().map_err(Into::into)
    }

    /// Tip commit of a local branch.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchNotFound`] if the branch does not exist
    pub fn get_branch(&self, name: &str) -> Result<git2::Oid, GitError> {
        let branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|e| match e.code() {
                git2::ErrorCode::NotFound => GitError::BranchNotFound {
                    name: name.to_string(),
                },
                _ => GitError::from_git2(e, name),
            })?;

        branch
            .get()
            .target()
            .ok_or_else(|| GitError::Internal {
                message: format!("branch {name} is symbolic"),
            })
    }

    /// Create a branch pointing at the given commit.
    pub fn create_branch(&self, name: &str, commit: git2::Oid) -> Result<(), GitError> {
        let commit = self
            .repo
            .find_commit(commit)
            .map_err(|e| GitError::from_git2(e, &commit.to_string()))?;
        self.repo
            .branch(name, &commit, false)
            .map_err(|e| GitError::from_git2(e, name))?;
        Ok(())
    }

    /// Discard all local divergence and point the working tree and HEAD at
    /// `target`: a commit id or any resolvable reference string
    /// (e.g. `refs/remotes/origin/master`).
    pub fn reset_hard(&self, target: &str) -> Result<(), GitError> {
        let object = self
            .repo
            .revparse_single(target)
            .map_err(|e| GitError::from_git2(e, target))?;
        self.repo.reset(&object, git2::ResetType::Hard, None)?;
        Ok(())
    }
}
