//! config
//!
//! Service settings: where workspaces live, where the remote is, and the
//! naming conventions everything else derives paths from.
//!
//! # Locations
//!
//! Searched in order:
//! 1. `$GITWARDEN_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitwarden/config.toml`
//! 3. `~/.config/gitwarden/config.toml`
//!
//! # Example file
//!
//! ```toml
//! workspace_dir = "/var/lib/gitwarden/workspaces"
//! remote_url = "https://git.example.com"
//! default_branch = "master"
//! ```
//!
//! `workspace_dir` and `remote_url` are required; everything else has a
//! default. The default branch name is configuration, never hard-coded
//! logic.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid setting: {0}")]
    InvalidValue(String),

    #[error("no settings file found")]
    NotFound,
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_admin_repository() -> String {
    "gitolite-admin".to_string()
}

fn default_projects_prefix() -> String {
    "projects/".to_string()
}

fn default_templates_prefix() -> String {
    "templates/".to_string()
}

/// Service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory holding one subdirectory per authenticated user.
    pub workspace_dir: PathBuf,

    /// Base URL of the remote Git host; repository paths are joined onto it.
    pub remote_url: String,

    /// Branch that pull and push reconcile against.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Name of the Gitolite admin repository on the remote.
    #[serde(default = "default_admin_repository")]
    pub admin_repository: String,

    /// Namespace prefix for project entries.
    #[serde(default = "default_projects_prefix")]
    pub projects_prefix: String,

    /// Namespace prefix for template entries.
    #[serde(default = "default_templates_prefix")]
    pub templates_prefix: String,
}

impl Settings {
    /// Create settings programmatically with defaults for the naming
    /// conventions.
    pub fn new(workspace_dir: impl Into<PathBuf>, remote_url: impl Into<String>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            remote_url: remote_url.into(),
            default_branch: default_branch(),
            admin_repository: default_admin_repository(),
            projects_prefix: default_projects_prefix(),
            templates_prefix: default_templates_prefix(),
        }
    }

    /// Load settings from the standard locations.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::NotFound`] if no settings file exists anywhere
    ///   in the search order
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = std::env::var("GITWARDEN_CONFIG") {
            return Self::load_from(Path::new(&path));
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitwarden/config.toml");
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("gitwarden/config.toml");
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Err(SettingsError::NotFound)
    }

    /// Load and validate settings from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Settings = toml::from_str(&text).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.remote_url.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "remote_url must not be empty".to_string(),
            ));
        }
        if self.default_branch.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "default_branch must not be empty".to_string(),
            ));
        }
        for (name, prefix) in [
            ("projects_prefix", &self.projects_prefix),
            ("templates_prefix", &self.templates_prefix),
        ] {
            if !prefix.ends_with('/') {
                return Err(SettingsError::InvalidValue(format!(
                    "{name} must end with '/'"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_gets_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            workspace_dir = "/srv/workspaces"
            remote_url = "https://git.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(settings.default_branch, "master");
        assert_eq!(settings.admin_repository, "gitolite-admin");
        assert_eq!(settings.projects_prefix, "projects/");
        assert_eq!(settings.templates_prefix, "templates/");
        settings.validate().unwrap();
    }

    #[test]
    fn missing_required_field_fails() {
        let result: Result<Settings, _> = toml::from_str(r#"remote_url = "x""#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_remote_url_rejected() {
        let settings = Settings::new("/srv/workspaces", "");
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn prefix_without_slash_rejected() {
        let mut settings = Settings::new("/srv/workspaces", "https://git.example.com");
        settings.projects_prefix = "projects".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn env_var_points_at_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            workspace_dir = "/srv/workspaces"
            remote_url = "https://git.example.com"
            "#,
        )
        .unwrap();

        std::env::set_var("GITWARDEN_CONFIG", &path);
        let settings = Settings::load().unwrap();
        std::env::remove_var("GITWARDEN_CONFIG");

        assert_eq!(settings.remote_url, "https://git.example.com");
    }

    #[test]
    fn overriding_default_branch() {
        let settings: Settings = toml::from_str(
            r#"
            workspace_dir = "/srv/workspaces"
            remote_url = "https://git.example.com"
            default_branch = "main"
            "#,
        )
        .unwrap();
        assert_eq!(settings.default_branch, "main");
    }
}
