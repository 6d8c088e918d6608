//! gitolite::conf
//!
//! Parser, in-memory store, and renderer for the Gitolite configuration
//! format.
//!
//! # Format
//!
//! One block per repository path: a `repo <path>` header followed by
//! indented `<perm> = <principals>` lines.
//!
//! ```text
//! repo projects/my-first-project
//!     R = alice
//!     RW = bob
//!     C = eve
//!
//! repo templates/my-first-template
//!     RW = alice bob eve
//! ```
//!
//! # Invariants
//!
//! - Entry names are unique; entry order is the insertion order of the
//!   source text
//! - Rule order inside an entry is significant and preserved
//! - `render(parse(text))` is semantically equal to `text` (same entries,
//!   same rules, same principal order); whitespace need not be identical
//!
//! The in-memory store lives for one request: parsed from the committed
//! file at load time, mutated by the patch engine, rendered back at save
//! time, then discarded.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::types::{RepoEntry, Rule};

/// Errors from configuration-store operations.
///
/// `EntryNotFound` maps to HTTP 404 at the caller, `DuplicateEntry` to 409;
/// parse and I/O failures are fatal for the request (500).
#[derive(Debug, Error)]
pub enum ConfError {
    /// Unparseable configuration content.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number of the offending line
        line: usize,
        /// What was wrong with it
        message: String,
    },

    /// Exact-name lookup failed.
    #[error("entry not found: {name}")]
    EntryNotFound {
        /// The name that was looked up
        name: String,
    },

    /// An entry with this name already exists.
    #[error("entry already exists: {name}")]
    DuplicateEntry {
        /// The conflicting name
        name: String,
    },

    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the configuration file.
    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An ordered set of access-rule entries, keyed by repository path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GitoliteConf {
    entries: Vec<RepoEntry>,
}

impl GitoliteConf {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// - [`ConfError::Parse`] on malformed lines, duplicate entry names,
    ///   rule lines outside a `repo` block, or unknown permissions
    pub fn parse(text: &str) -> Result<Self, ConfError> {
        let mut conf = Self::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            // A '#' starts a comment, whole-line or trailing.
            let line = raw_line.trim();
            let line = match line.find('#') {
                Some(pos) => line[..pos].trim_end(),
                None => line,
            };

            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("repo ") {
                let name = rest.trim();
                if name.is_empty() || name.split_whitespace().count() != 1 {
                    return Err(ConfError::Parse {
                        line: line_no,
                        message: format!("expected a single repository path, got '{rest}'"),
                    });
                }
                if conf.contains(name) {
                    return Err(ConfError::Parse {
                        line: line_no,
                        message: format!("duplicate entry '{name}'"),
                    });
                }
                conf.entries.push(RepoEntry::new(name));
                continue;
            }

            // Anything else must be a rule line inside the current block.
            let entry = conf.entries.last_mut().ok_or(ConfError::Parse {
                line: line_no,
                message: "rule outside of a 'repo' block".to_string(),
            })?;

            let (perm, users) = line.split_once('=').ok_or(ConfError::Parse {
                line: line_no,
                message: "expected '<perm> = <principals>'".to_string(),
            })?;

            let perm = perm.trim().parse().map_err(|e| ConfError::Parse {
                line: line_no,
                message: format!("{e}"),
            })?;

            let users: Vec<String> = users.split_whitespace().map(String::from).collect();
            if users.is_empty() {
                return Err(ConfError::Parse {
                    line: line_no,
                    message: "rule has no principals".to_string(),
                });
            }

            entry.rules.push(Rule { perm, users });
        }

        Ok(conf)
    }

    /// Read and parse the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// All entries, in source order.
    pub fn entries(&self) -> &[RepoEntry] {
        &self.entries
    }

    /// Whether an entry with this exact name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Exact lookup.
    ///
    /// # Errors
    ///
    /// - [`ConfError::EntryNotFound`] if absent
    pub fn get(&self, name: &str) -> Result<&RepoEntry, ConfError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ConfError::EntryNotFound {
                name: name.to_string(),
            })
    }

    /// Exact lookup, mutable.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut RepoEntry, ConfError> {
        self.entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| ConfError::EntryNotFound {
                name: name.to_string(),
            })
    }

    /// Append a new entry.
    ///
    /// # Errors
    ///
    /// - [`ConfError::DuplicateEntry`] if the name is already present
    pub fn add(&mut self, entry: RepoEntry) -> Result<(), ConfError> {
        if self.contains(&entry.name) {
            return Err(ConfError::DuplicateEntry { name: entry.name });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Remove an entry by exact name.
    ///
    /// # Errors
    ///
    /// - [`ConfError::EntryNotFound`] if absent
    pub fn remove(&mut self, name: &str) -> Result<RepoEntry, ConfError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| ConfError::EntryNotFound {
                name: name.to_string(),
            })?;
        Ok(self.entries.remove(index))
    }

    /// Names of all entries under a namespace prefix, with the prefix
    /// stripped, in source order.
    pub fn list(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|e| e.name.strip_prefix(prefix))
            .map(String::from)
            .collect()
    }

    /// Serialize back to the on-disk textual format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str("repo ");
            out.push_str(&entry.name);
            out.push('\n');
            for rule in &entry.rules {
                out.push_str("    ");
                out.push_str(rule.perm.as_str());
                out.push_str(" = ");
                out.push_str(&rule.users.join(" "));
                out.push('\n');
            }
        }
        out
    }

    /// Render and write the configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfError> {
        std::fs::write(path, self.render()).map_err(|source| ConfError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
