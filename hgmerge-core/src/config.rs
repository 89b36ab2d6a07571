//! Configuration management for hgmerge
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (HGMERGE_*)
//! 3. Config file (~/.config/hgmerge/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How the external tools are invoked
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HgConfig {
    /// Path to the hg executable
    pub hg_path: String,

    /// Python interpreter used by hg extensions and hg-fast-export
    pub python_path: String,

    /// Path to the git executable
    pub git_path: String,

    /// hg-fast-export script used by gitify
    pub fast_export_path: String,

    /// Username recorded on commits (falls back to hg's own configuration)
    pub username: Option<String>,

    /// Kill any single command running longer than this
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for HgConfig {
    fn default() -> Self {
        Self {
            hg_path: "hg".to_string(),
            python_path: "python".to_string(),
            git_path: "git".to_string(),
            fast_export_path: "hg-fast-export.sh".to_string(),
            username: None,
            timeout: None,
        }
    }
}

/// Where clones land when no destination is given
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CloneConfig {
    /// Parent directory for clones (defaults to the current directory)
    pub base_dir: Option<PathBuf>,
}

impl CloneConfig {
    /// Resolve the base directory for clones
    pub fn base_dir(&self) -> Result<PathBuf> {
        match self.base_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// External tool configuration
    pub hg: HgConfig,

    /// Clone destination configuration
    pub clone: CloneConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/hgmerge/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hgmerge").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - HGMERGE_HG_PATH: Path to hg executable
    /// - HGMERGE_PYTHON_PATH: Python interpreter
    /// - HGMERGE_USERNAME: Commit username
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(hg_path) = lookup("HGMERGE_HG_PATH") {
            self.hg.hg_path = hg_path;
        }

        if let Some(python_path) = lookup("HGMERGE_PYTHON_PATH") {
            self.hg.python_path = python_path;
        }

        if let Some(username) = lookup("HGMERGE_USERNAME") {
            self.hg.username = Some(username);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        mut self,
        hg_path: Option<String>,
        python_path: Option<String>,
    ) -> Self {
        if let Some(path) = hg_path {
            self.hg.hg_path = path;
        }

        if let Some(path) = python_path {
            self.hg.python_path = path;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        hg_path: Option<String>,
        python_path: Option<String>,
    ) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(hg_path, python_path))
    }
}
