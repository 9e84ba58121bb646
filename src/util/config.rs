//! Configuration file support.
//!
//! Slipway reads a single user-level config file,
//! `~/.config/slipway/config.toml`, for the knobs that are host-specific
//! rather than recipe-specific: where downloaded archives are cached and
//! which file names to try when locating an interpreter's runtime library.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Slipway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Download/extraction cache settings
    pub cache: CacheConfig,

    /// Runtime-library naming settings
    pub naming: NamingConfig,
}

/// Cache directory settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Override for the archive cache directory
    pub dir: Option<PathBuf>,
}

/// Candidate file names for an interpreter's runtime library.
///
/// The set of spellings a `libpython` can hide behind is inherently
/// platform- and version-specific, so the ordered search list is kept in
/// config rather than hardcoded. Templates may use `{prefix}` and
/// `{version}` placeholders; the first candidate the probe reports as
/// existing wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Ordered library path templates
    pub library_templates: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        NamingConfig {
            library_templates: vec![
                // Framework-style install (macOS system and framework builds)
                "{prefix}/Python".to_string(),
                "{prefix}/lib/libpython{version}.a".to_string(),
                "{prefix}/lib/libpython{version}.dylib".to_string(),
                "{prefix}/lib/libpython{version}.so".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        }

        let contents =
            toml::to_string_pretty(self).with_context(|| "failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Resolve the cache directory, honoring the config override.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache.dir {
            return Ok(dir.clone());
        }

        let dirs = ProjectDirs::from("", "", "slipway")
            .context("could not determine a cache directory for this platform")?;
        Ok(dirs.cache_dir().to_path_buf())
    }
}

/// Path to the user-level config file, if a home directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "slipway").map(|d| d.config_dir().join("config.toml"))
}

/// Load the user-level config, or defaults when none exists.
pub fn load_user_config() -> Config {
    match user_config_path() {
        Some(path) => Config::load_or_default(&path),
        None => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_naming_templates_ordered() {
        let naming = NamingConfig::default();
        assert_eq!(naming.library_templates[0], "{prefix}/Python");
        assert!(naming.library_templates.len() >= 3);
    }

    #[test]
    fn test_config_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.cache.dir = Some(PathBuf::from("/tmp/slipway-cache"));
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.cache.dir, config.cache.dir);
        assert_eq!(
            loaded.naming.library_templates,
            config.naming.library_templates
        );
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.toml"));
        assert!(config.cache.dir.is_none());
    }

    #[test]
    fn test_cache_dir_override() {
        let mut config = Config::default();
        config.cache.dir = Some(PathBuf::from("/custom/cache"));
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/custom/cache"));
    }
}
