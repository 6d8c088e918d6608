//! Gitwarden - Git synchronization and access-rule engine for
//! Gitolite-backed configuration repositories.
//!
//! Gitwarden is the core behind an HTTP API that manages projects and
//! templates stored as access-control rule sets in a Gitolite-style
//! configuration repository. Each authenticated user works against
//! private clones in a per-user workspace, synchronized with the remote
//! before every operation and pushed back after each change.
//!
//! # Architecture
//!
//! - [`config`] - service settings (workspace root, remote URL, naming)
//! - [`git`] - single interface for all Git operations: open/init,
//!   staging, commits, fetch, fast-forward-only pull, push with rollback
//!   on denial, typed transport-error translation
//! - [`gitolite`] - the access-rule model: parse, look up, patch, render,
//!   and persist rule files; the admin repository binds a rule store to a
//!   Git working copy by composition
//! - [`workspace`] - per-user repository materialization and per-resource
//!   locking
//!
//! The HTTP layer, token verification, JSON-schema validation, and the
//! template scaffolding engine are collaborators outside this crate.
//!
//! # Correctness Invariants
//!
//! 1. Pulls are fast-forward only; divergent histories always require
//!    manual intervention
//! 2. A push denied by the remote never leaves the local repository
//!    diverged from what the user is authorized to see
//! 3. Entry order and rule order in the configuration survive every
//!    parse, patch, and render
//! 4. Errors are typed and surfaced synchronously; nothing is retried
//!    internally

pub mod config;
pub mod git;
pub mod gitolite;
pub mod workspace;
