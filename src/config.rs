// src/config.rs
//! Import configuration
//!
//! Supports TOML configuration files with the following sections:
//! - [ownership] - Identity and directory mode Conary assumes by default
//! - [scripts] - Accepted scriptlet interpreters, info recipe output
//! - [layout] - Where generated tag handler files are installed
//!
//! Every field has a default matching stock Conary macros, so an empty file
//! (or no file at all) is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub ownership: OwnershipSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub layout: LayoutSection,
}

/// Default file identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipSection {
    /// Owner assumed for files without an `Ownership` directive
    #[serde(default = "default_identity")]
    pub owner: String,

    /// Group assumed for files without an `Ownership` directive
    #[serde(default = "default_identity")]
    pub group: String,

    /// Directory mode that needs no explicit inclusion
    #[serde(default = "default_dir_mode")]
    pub dir_mode: u32,
}

impl Default for OwnershipSection {
    fn default() -> Self {
        Self {
            owner: default_identity(),
            group: default_identity(),
            dir_mode: default_dir_mode(),
        }
    }
}

fn default_identity() -> String {
    "root".to_string()
}

fn default_dir_mode() -> u32 {
    0o755
}

/// Scriptlet handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsSection {
    /// Interpreters whose scriptlets are carried over
    #[serde(default = "default_interpreters")]
    pub allowed_interpreters: Vec<String>,

    /// Write `info-<name>.recipe` files for captured accounts
    #[serde(default = "default_true")]
    pub info_recipes: bool,
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            allowed_interpreters: default_interpreters(),
            info_recipes: true,
        }
    }
}

fn default_interpreters() -> Vec<String> {
    vec!["/bin/sh".to_string(), "/bin/bash".to_string()]
}

fn default_true() -> bool {
    true
}

/// Install locations for tag handler artifacts
///
/// Values may use Conary macros; they are expanded at cook time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSection {
    /// Dispatcher script directory
    #[serde(default = "default_handler_dir")]
    pub handler_dir: String,

    /// Tag description directory
    #[serde(default = "default_description_dir")]
    pub description_dir: String,

    /// Parent of the per-package wrapped scriptlet directories
    #[serde(default = "default_scriptlet_dir")]
    pub scriptlet_dir: String,

    /// Directory holding the update marker files
    #[serde(default = "default_marker_dir")]
    pub marker_dir: String,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            handler_dir: default_handler_dir(),
            description_dir: default_description_dir(),
            scriptlet_dir: default_scriptlet_dir(),
            marker_dir: default_marker_dir(),
        }
    }
}

fn default_handler_dir() -> String {
    "%(taghandlerdir)s".to_string()
}

fn default_description_dir() -> String {
    "%(tagdescriptiondir)s".to_string()
}

fn default_scriptlet_dir() -> String {
    "%(datadir)s/conary/rpm-scriptlets".to_string()
}

fn default_marker_dir() -> String {
    "%(localstatedir)s/lib/conary/rpm-scriptlets".to_string()
}

impl ImportConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ImportConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.ownership.owner.is_empty() || self.ownership.group.is_empty() {
            anyhow::bail!("ownership.owner and ownership.group must not be empty");
        }
        if self.ownership.dir_mode > 0o7777 {
            anyhow::bail!(
                "ownership.dir_mode must be a permission mode, got {:o}",
                self.ownership.dir_mode
            );
        }

        if self.scripts.allowed_interpreters.is_empty() {
            anyhow::bail!("scripts.allowed_interpreters must list at least one interpreter");
        }
        for interpreter in &self.scripts.allowed_interpreters {
            if !interpreter.starts_with('/') {
                anyhow::bail!(
                    "scripts.allowed_interpreters entries must be absolute paths, got '{}'",
                    interpreter
                );
            }
        }

        for (key, value) in [
            ("layout.handler_dir", &self.layout.handler_dir),
            ("layout.description_dir", &self.layout.description_dir),
            ("layout.scriptlet_dir", &self.layout.scriptlet_dir),
            ("layout.marker_dir", &self.layout.marker_dir),
        ] {
            if !(value.starts_with('/') || value.starts_with("%(")) {
                anyhow::bail!(
                    "{} must be an absolute path or start with a macro, got '{}'",
                    key,
                    value
                );
            }
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
