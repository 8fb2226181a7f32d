//! `hostkit config`: show configuration values.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::domain::config::ConfigSupplier;
use crate::output::json;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show every configuration value
    Show,
    /// Print one value, e.g. `mattermost::site_url`
    Get {
        /// Configuration key (`section::field`)
        key: String,
    },
    /// Print the path of the configuration file in use
    Path,
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the key is
/// missing.
pub fn run(app: &AppContext, cmd: &ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => show_config(app),
        ConfigCommand::Get { key } => get_value(app, key),
        ConfigCommand::Path => show_path(app),
    }
}

fn show_config(app: &AppContext) -> Result<ExitCode> {
    let (path, config) = super::load_config(app)?;
    let entries = config.flatten();
    if app.is_json() {
        let values: serde_json::Map<String, serde_json::Value> = entries
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        println!(
            "{}",
            json::format_value(&serde_json::json!({
                "path": path.display().to_string(),
                "values": values,
            }))?
        );
    } else {
        app.human().render_config(&entries, &path);
    }
    Ok(ExitCode::SUCCESS)
}

fn get_value(app: &AppContext, key: &str) -> Result<ExitCode> {
    let (_, config) = super::load_config(app)?;
    let value = config.get(key)?;
    if app.is_json() {
        println!(
            "{}",
            json::format_value(&serde_json::json!({ "key": key, "value": value }))?
        );
    } else {
        println!("{value}");
    }
    Ok(ExitCode::SUCCESS)
}

fn show_path(app: &AppContext) -> Result<ExitCode> {
    let path = app.config_store.path()?;
    if app.is_json() {
        println!(
            "{}",
            json::format_value(&serde_json::json!({ "path": path.display().to_string() }))?
        );
    } else {
        println!("{}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
