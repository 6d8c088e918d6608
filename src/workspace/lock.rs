//! workspace::lock
//!
//! Per-(user, resource) exclusive lock.
//!
//! # Architecture
//!
//! The Git core does not synchronize concurrent requests racing on the
//! same user+resource pair; two unsynchronized requests can corrupt the
//! local working copy or interleave a fast-forward with a reset. The
//! caller serializes such requests by holding a [`ResourceLock`] for the
//! duration of each request.
//!
//! # Invariants
//!
//! - Acquisition is non-blocking: a held lock fails fast with
//!   [`LockError::AlreadyLocked`]
//! - The lock is released on drop (RAII), so it survives panics
//! - Locking is OS-level (`fs2`), so it works across processes

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another request already holds the lock for this resource.
    #[error("resource is locked by another request")]
    AlreadyLocked,

    /// Failed to create the lock file or its parent directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock over one (user, resource) pair.
///
/// Released automatically when dropped.
#[derive(Debug)]
pub struct ResourceLock {
    /// Path to the lock file.
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl ResourceLock {
    /// Attempt to acquire the lock at the given lock-file path.
    ///
    /// Non-blocking: if another process or request holds the lock, this
    /// returns [`LockError::AlreadyLocked`] immediately.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path: path.to_path_buf(),
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Try to acquire, returning `None` when already held.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, LockError> {
        match Self::acquire(path) {
            Ok(lock) => Ok(Some(lock)),
            Err(LockError::AlreadyLocked) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether this guard still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ResourceLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alice/admin.lock");

        let mut lock = ResourceLock::acquire(&path).unwrap();
        assert!(lock.is_held());
        lock.release().unwrap();
        assert!(!lock.is_held());
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alice/admin.lock");

        let _held = ResourceLock::acquire(&path).unwrap();
        assert!(matches!(
            ResourceLock::acquire(&path),
            Err(LockError::AlreadyLocked)
        ));
    }

    #[test]
    fn try_acquire_returns_none_while_held() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alice/admin.lock");

        let _held = ResourceLock::acquire(&path).unwrap();
        assert!(ResourceLock::try_acquire(&path).unwrap().is_none());
    }

    #[test]
    fn released_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alice/admin.lock");

        {
            let _held = ResourceLock::acquire(&path).unwrap();
        }
        assert!(ResourceLock::acquire(&path).is_ok());
    }

    #[test]
    fn distinct_resources_do_not_conflict() {
        let dir = TempDir::new().unwrap();

        let _a = ResourceLock::acquire(&dir.path().join("alice/admin.lock")).unwrap();
        let b = ResourceLock::acquire(&dir.path().join("alice/projects__x.lock"));
        assert!(b.is_ok());
    }
}
