//! gitolite
//!
//! The access-rule configuration model: parse, look up, patch, render,
//! and persist Gitolite-style rule files.
//!
//! # Components
//!
//! - [`types`] - `Permission`, `Rule`, `RepoEntry` domain types
//! - [`conf`] - ordered rule store with parser and renderer
//! - [`patch`] - JSON-Patch-style edits to one entry's rule list
//! - [`admin`] - rule store bound by composition to a Git working copy
//!
//! # Example
//!
//! ```
//! use gitwarden::gitolite::{apply, GitoliteConf, PatchOperation};
//!
//! let mut conf = GitoliteConf::parse("repo projects/demo\n    RW = alice\n")?;
//! let patches: Vec<PatchOperation> = serde_json::from_str(
//!     r#"[{"op":"add","path":"/rules/0","value":{"perm":"R","users":["bob"]}}]"#,
//! ).unwrap();
//!
//! let entry = conf.get_mut("projects/demo")?;
//! apply(entry, &patches)?;
//! assert_eq!(entry.rules.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod admin;
pub mod conf;
pub mod patch;
pub mod types;

pub use admin::{AdminError, AdminRepository, ADMIN_CONF_PATH};
pub use conf::{ConfError, GitoliteConf};
pub use patch::{apply, PatchError, PatchOperation, PatchVerb};
pub use types::{Permission, RepoEntry, Rule};
