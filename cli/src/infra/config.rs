//! Locating and loading `config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::config::DeployConfig;
use crate::domain::error::ConfigError;

/// File name searched for in the working directory and its ancestors.
pub const CONFIG_FILE: &str = "config.toml";
/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "HOSTKIT_CONFIG";

/// Loads the deployment configuration from disk.
#[derive(Debug, Clone, Default)]
pub struct TomlConfigStore {
    explicit: Option<PathBuf>,
}

impl TomlConfigStore {
    /// `explicit` comes from `--config` (or `HOSTKIT_CONFIG`) and wins over
    /// the directory search.
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    /// Resolve the configuration file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when no file is found.
    pub fn path(&self) -> Result<PathBuf> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        let home = dirs::home_dir();
        Ok(resolve_path(
            self.explicit.as_deref(),
            &cwd,
            home.as_deref(),
            Path::is_file,
        )?)
    }

    /// Resolve and parse the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be found, read or parsed.
    pub fn load(&self) -> Result<(PathBuf, DeployConfig)> {
        let path = self.path()?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config = DeployConfig::parse(&content)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok((path, config))
    }
}

/// Pick the configuration file: `explicit` if given, else the nearest
/// `config.toml` in `start` or an ancestor, else `~/.hostkit/config.toml`.
///
/// An explicit path is returned even if it does not exist, so the read
/// error names the path the user asked for.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] when there is no explicit path and no
/// candidate exists.
pub fn resolve_path(
    explicit: Option<&Path>,
    start: &Path,
    home: Option<&Path>,
    exists: impl Fn(&Path) -> bool,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(found) = start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| exists(candidate))
    {
        return Ok(found);
    }
    if let Some(home) = home {
        let fallback = home.join(".hostkit").join(CONFIG_FILE);
        if exists(&fallback) {
            return Ok(fallback);
        }
    }
    Err(ConfigError::NotFound {
        file: CONFIG_FILE.to_string(),
        start: start.display().to_string(),
    })
}
