//! Command implementations

pub mod config;
pub mod deploy;
pub mod doctor;
pub mod exec;
pub mod playbooks;
pub mod version;

use std::path::PathBuf;

use anyhow::Result;

use crate::app::AppContext;
use crate::domain::config::DeployConfig;

/// Load the configuration file selected by the global flags.
///
/// # Errors
///
/// Returns an error if no file is found or it cannot be parsed.
pub(crate) fn load_config(app: &AppContext) -> Result<(PathBuf, DeployConfig)> {
    app.config_store.load()
}
