//! Configuration file discovery and loading.
//!
//! This module finds the configuration file to use, in priority order:
//!
//! 1. An explicit path (`--config`)
//! 2. Project config: `.nbcache.yml` in the working directory
//! 3. User global config: `~/.nbcache/config.yml`
//!
//! Only the first file found is read. With no file, defaults apply.

use std::fs;
use std::path::{Path, PathBuf};

use super::CacheConfig;
use crate::error::{CacheError, Result};

/// Candidate configuration files.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Explicitly requested config file.
    pub explicit: Option<PathBuf>,

    /// Project config: .nbcache.yml
    pub project: Option<PathBuf>,

    /// User's global config: ~/.nbcache/config.yml
    pub user_global: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files relative to `working_dir`.
    pub fn discover(working_dir: &Path, explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            project: Self::find_project_config(working_dir),
            user_global: Self::find_user_global(),
        }
    }

    fn find_project_config(working_dir: &Path) -> Option<PathBuf> {
        let path = working_dir.join(".nbcache.yml");
        path.exists().then_some(path)
    }

    fn find_user_global() -> Option<PathBuf> {
        let path = dirs::home_dir()?.join(".nbcache").join("config.yml");
        path.exists().then_some(path)
    }

    /// The file that wins, if any.
    pub fn selected(&self) -> Option<&PathBuf> {
        self.explicit
            .as_ref()
            .or(self.project.as_ref())
            .or(self.user_global.as_ref())
    }
}

/// Load and validate the configuration selected by `paths`.
///
/// # Errors
///
/// Returns [`CacheError::ConfigNotFound`] if an explicit file is missing,
/// [`CacheError::ConfigParseError`] for malformed YAML and
/// [`CacheError::ConfigValidationError`] for invalid values.
pub fn load_config(paths: &ConfigPaths) -> Result<CacheConfig> {
    let config = match paths.selected() {
        Some(path) => load_file(path)?,
        None => CacheConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn load_file(path: &Path) -> Result<CacheConfig> {
    if !path.exists() {
        return Err(CacheError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(CacheConfig::default());
    }

    tracing::debug!("Loading config from {:?}", path);
    serde_yaml::from_str(&content).map_err(|e| CacheError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
