//! git::errors
//!
//! Typed failure taxonomy for Git operations, and the translation of
//! free-text transport failures into that taxonomy.
//!
//! # Error Handling
//!
//! Git failures are categorized into typed variants so the calling layer
//! can map each one deterministically to an HTTP status:
//!
//! - [`GitError::NotARepo`]: repository not discoverable (404)
//! - [`GitError::RemoteNotFound`]: named remote missing (404)
//! - [`GitError::BranchNotFound`]: named branch missing (503)
//! - [`GitError::RemoteDuplicate`]: remote name already bound (409, or
//!   ignored by callers wanting idempotent ensure-remote semantics)
//! - [`GitError::Forbidden`]: push/pull denied by server-side policy (401/403)
//! - [`GitError::MergeUnavailable`]: divergent histories, manual merge
//!   required (412)
//! - [`GitError::SignatureMissing`]: no author identity available (500)
//! - [`GitError::Transport`]: unrecognized transport failure, original
//!   message preserved (500)
//! - [`GitError::Internal`]: git2-layer contract violation (500)
//!
//! # Translation
//!
//! The smart Git protocol carries no structured error codes, only free-text
//! messages. [`translate`] is the single seam where those messages are
//! heuristically classified: a Gitolite hook rejection or an embedded
//! HTTP 401 becomes [`GitError::Forbidden`]; anything unrecognized is
//! forwarded as [`GitError::Transport`] with its message intact so no
//! information is swallowed. If the hosting layer ever gains structured
//! errors, this one function is the only thing to replace.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Gitolite denies access with a fallthru message on the error channel.
const FORBIDDEN_PATTERN: &str = r"^Remote error: FATAL: \S* any \S* \S* DENIED by fallthru";

/// Some transports surface the raw HTTP status instead.
const HTTP_STATUS_PATTERN: &str = r"^[Uu]nexpected HTTP status code: (\d+)";

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// No Git repository discoverable from the given path.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Requested remote does not exist.
    #[error("remote not found: {name}")]
    RemoteNotFound {
        /// The remote that was not found
        name: String,
    },

    /// Requested branch does not exist.
    #[error("branch not found: {name}")]
    BranchNotFound {
        /// The branch that was not found
        name: String,
    },

    /// A remote with this name already exists.
    #[error("remote already exists: {name}")]
    RemoteDuplicate {
        /// The conflicting remote name
        name: String,
    },

    /// The remote denied the operation (Gitolite policy rejection or
    /// an embedded HTTP 401).
    #[error("access denied by remote")]
    Forbidden,

    /// Local and remote histories have diverged; only fast-forward merges
    /// are performed automatically.
    #[error("automatic merge not available: histories have diverged")]
    MergeUnavailable,

    /// No commit author available: none passed, none cached, and the
    /// repository has no default signature configured.
    #[error("no signature available for commit")]
    SignatureMissing,

    /// Transport failure that matched no known pattern. The original
    /// message is preserved verbatim.
    #[error("transport error: {message}")]
    Transport {
        /// The untranslated transport message
        message: String,
    },

    /// Internal git2 error or contract violation.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with context about what was
    /// being resolved.
    pub(crate) fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::Internal {
                message: format!("{} not found: {}", context, err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

fn forbidden_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FORBIDDEN_PATTERN).expect("invalid forbidden pattern"))
}

fn http_status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(HTTP_STATUS_PATTERN).expect("invalid http status pattern"))
}

/// Translate a transport-layer failure into the typed taxonomy.
///
/// Recognizes two shapes of "access denied":
///
/// 1. An embedded HTTP status line (`Unexpected HTTP status code: 401`)
/// 2. Gitolite's hook rejection (`Remote error: FATAL: ... DENIED by fallthru`)
///
/// Everything else is forwarded as [`GitError::Transport`] with the
/// original message, so unrecognized failures lose no information.
pub fn translate(err: git2::Error) -> GitError {
    let message = err.message();

    if let Some(caps) = http_status_re().captures(message) {
        if caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u16>().ok())
            .is_some_and(|status| status == 401)
        {
            return GitError::Forbidden;
        }
    }

    if forbidden_re().is_match(message) {
        return GitError::Forbidden;
    }

    GitError::Transport {
        message: message.to_string(),
    }
}
