//! gitolite::admin
//!
//! The admin repository: a rule store bound to a Git working copy.
//!
//! # Composition
//!
//! [`AdminRepository`] *holds* a [`GitRepository`] rather than being one.
//! The rule store mutates the configuration file on disk and then asks the
//! Git layer to commit and push; it does not own the Git lifecycle. The
//! caller materializes and synchronizes the working copy first (see
//! [`crate::workspace`]), then loads the store from the committed file.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::git::{GitError, GitRepository};

use super::conf::{ConfError, GitoliteConf};

/// Location of the main configuration file inside the admin repository.
pub const ADMIN_CONF_PATH: &str = "conf/gitolite.conf";

/// Errors from admin-repository operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Conf(#[from] ConfError),
}

/// A Gitolite configuration under a Git repository.
///
/// Load the committed configuration, mutate it through
/// [`conf_mut`](Self::conf_mut) (typically via the patch engine), then
/// [`save`](Self::save) to write, commit, and push in one step. A denied
/// push rolls the working copy back to the remote-tracking state (see
/// [`GitRepository::push`]) before the error reaches the caller.
#[derive(Debug)]
pub struct AdminRepository {
    git: GitRepository,
    conf: GitoliteConf,
}

impl AdminRepository {
    /// Load the configuration committed in the given working copy.
    ///
    /// # Errors
    ///
    /// - [`ConfError::Read`] if the configuration file is unreadable
    /// - [`ConfError::Parse`] if its content is malformed
    pub fn load(git: GitRepository) -> Result<Self, AdminError> {
        let conf = GitoliteConf::load(&git.workdir()?.join(ADMIN_CONF_PATH))?;
        Ok(Self { git, conf })
    }

    /// The in-memory rule store.
    pub fn conf(&self) -> &GitoliteConf {
        &self.conf
    }

    /// The in-memory rule store, mutable.
    pub fn conf_mut(&mut self) -> &mut GitoliteConf {
        &mut self.conf
    }

    /// The underlying Git working copy.
    pub fn git(&self) -> &GitRepository {
        &self.git
    }

    /// The underlying Git working copy, mutable (e.g. to set the commit
    /// author identity).
    pub fn git_mut(&mut self) -> &mut GitRepository {
        &mut self.git
    }

    /// Absolute path of the configuration file.
    fn conf_path(&self) -> Result<PathBuf, AdminError> {
        Ok(self.git.workdir()?.join(ADMIN_CONF_PATH))
    }

    /// Render the configuration, commit all changes, and push.
    ///
    /// # Errors
    ///
    /// - [`GitError::Forbidden`] if the remote rejects the push; the local
    ///   rejected commits have already been discarded when this is raised
    pub fn save(&mut self, message: &str, remote: &str, branch: &str) -> Result<(), AdminError> {
        let path = self.conf_path()?;
        self.conf.save(&path)?;

        self.git.commit_all(message, None)?;
        self.git.push(remote, branch)?;

        info!(message, remote, branch, "saved gitolite configuration");
        Ok(())
    }
}
