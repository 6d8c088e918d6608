//! gitolite::types
//!
//! Domain types for the access-rule model.
//!
//! # Types
//!
//! - [`Permission`] - Access level granted by a rule (`R`, `RW`, `C`)
//! - [`Rule`] - A permission granted to an ordered set of principals
//! - [`RepoEntry`] - One configuration block: a repository path and its rules
//!
//! The serde shapes match the wire contract of the HTTP layer:
//! `{"perm": "RW", "users": ["alice", "@ops"]}`.
//!
//! # Examples
//!
//! ```
//! use gitwarden::gitolite::{Permission, Rule};
//!
//! let rule = Rule::new(Permission::ReadWrite, ["alice", "@ops"]);
//! assert_eq!(rule.perm.as_str(), "RW");
//!
//! assert_eq!("C".parse::<Permission>().unwrap(), Permission::Create);
//! assert!("RW+".parse::<Permission>().is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error from parsing a permission token.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown permission: {0}")]
pub struct PermissionParseError(pub String);

/// Access level granted by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    /// Read-only access.
    #[serde(rename = "R")]
    Read,
    /// Read and write access.
    #[serde(rename = "RW")]
    ReadWrite,
    /// Permission to create repositories.
    #[serde(rename = "C")]
    Create,
}

impl Permission {
    /// The configuration-file token for this permission.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "R",
            Permission::ReadWrite => "RW",
            Permission::Create => "C",
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R" => Ok(Permission::Read),
            "RW" => Ok(Permission::ReadWrite),
            "C" => Ok(Permission::Create),
            other => Err(PermissionParseError(other.to_string())),
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A permission granted to an ordered set of principals.
///
/// Principal order is significant and preserved through parse, patch, and
/// render: Gitolite evaluates rules top to bottom, so later rules can
/// override earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The access level granted.
    pub perm: Permission,
    /// Users and `@group` references, in order.
    pub users: Vec<String>,
}

impl Rule {
    /// Create a rule granting `perm` to the given principals.
    pub fn new<I, S>(perm: Permission, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            perm,
            users: users.into_iter().map(Into::into).collect(),
        }
    }
}

/// One configuration block: a repository path and its ordered rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    /// Repository path, e.g. `projects/foo` or `templates/bar`.
    pub name: String,
    /// Rules in file order.
    pub rules: Vec<Rule>,
}

impl RepoEntry {
    /// Create an entry with no rules yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }
}
