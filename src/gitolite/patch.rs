//! gitolite::patch
//!
//! Structured (JSON-Patch-style) edits to one entry's rule list.
//!
//! # Wire shape
//!
//! ```json
//! [{"op": "replace", "path": "/rules/0", "value": {"perm": "RW", "users": ["@all"]}}]
//! ```
//!
//! # Semantics
//!
//! - `path` must be `/rules/{integer}`; `/name` is rejected for every op
//!   (renaming is not supported), anything else is an unsupported path
//! - `add` appends, ignoring the index; `replace` and `remove` require the
//!   index to be in bounds and the error names the offending index;
//!   `remove` ignores any payload it is given
//! - Operations apply in order; the first rejected operation aborts the
//!   batch: earlier operations stay applied, later ones never run
//!
//! All patch failures are caller input errors (HTTP 400), except the
//! rename rejection which the caller reports as unimplemented.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{RepoEntry, Rule};

/// The three supported patch verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchVerb {
    Add,
    Replace,
    Remove,
}

impl std::fmt::Display for PatchVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchVerb::Add => f.write_str("add"),
            PatchVerb::Replace => f.write_str("replace"),
            PatchVerb::Remove => f.write_str("remove"),
        }
    }
}

/// One structured patch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchOperation {
    /// What to do.
    pub op: PatchVerb,
    /// Where to do it: `/rules/{index}`.
    pub path: String,
    /// The rule payload for `add` and `replace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Rule>,
}

/// Errors from patch validation and application.
///
/// Each variant names the 0-based position of the rejected operation in
/// the batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    /// `/name` was targeted; renaming is not supported.
    #[error("operation {index}: renaming is not supported")]
    RenameUnsupported {
        /// Position of the rejected operation
        index: usize,
    },

    /// The path matched neither `/name` nor `/rules/{integer}`.
    #[error("operation {index}: unsupported patch path '{path}'")]
    UnsupportedPath { index: usize, path: String },

    /// A `replace` or `remove` referenced a rule index past the end.
    #[error("operation {index}: rule index {rule_index} out of range (entry has {len} rules)")]
    IndexOutOfRange {
        index: usize,
        /// The offending rule index
        rule_index: usize,
        /// Current rule count of the entry
        len: usize,
    },

    /// An `add` or `replace` arrived without a rule payload.
    #[error("operation {index}: missing value for '{op}'")]
    MissingValue { index: usize, op: PatchVerb },
}

/// Parse a `/rules/{integer}` path into its index.
fn rule_index(path: &str) -> Option<usize> {
    let digits = path.strip_prefix("/rules/")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Apply an ordered batch of patch operations to one entry.
///
/// Mutates `entry.rules` in place. The first rejected operation aborts the
/// batch: operations before it remain applied, operations after it are
/// never attempted, and the error identifies the rejected operation by
/// position.
pub fn apply(entry: &mut RepoEntry, patches: &[PatchOperation]) -> Result<(), PatchError> {
    for (index, patch) in patches.iter().enumerate() {
        if patch.path == "/name" {
            return Err(PatchError::RenameUnsupported { index });
        }

        let rule_index = rule_index(&patch.path).ok_or_else(|| PatchError::UnsupportedPath {
            index,
            path: patch.path.clone(),
        })?;

        match patch.op {
            PatchVerb::Add => {
                // The index is ignored: add always appends.
                let value = require_value(index, patch)?;
                entry.rules.push(value);
            }
            PatchVerb::Replace => {
                let value = require_value(index, patch)?;
                let len = entry.rules.len();
                let slot = entry.rules.get_mut(rule_index).ok_or(
                    PatchError::IndexOutOfRange {
                        index,
                        rule_index,
                        len,
                    },
                )?;
                *slot = value;
            }
            PatchVerb::Remove => {
                // A payload on remove is ignored, not rejected.
                if rule_index >= entry.rules.len() {
                    return Err(PatchError::IndexOutOfRange {
                        index,
                        rule_index,
                        len: entry.rules.len(),
                    });
                }
                entry.rules.remove(rule_index);
            }
        }
    }

    Ok(())
}

fn require_value(index: usize, patch: &PatchOperation) -> Result<Rule, PatchError> {
    patch.value.clone().ok_or(PatchError::MissingValue {
        index,
        op: patch.op,
    })
}
