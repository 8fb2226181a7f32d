//! `tools`: prompt, terminal multiplexer and file manager for debugging.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::ports::{ConfigSupplier, RemoteSession};
use crate::application::services::runbook::Runbook;
use crate::domain::playbook::PlaybookKind;
use crate::domain::step::{Action, Probe, Step};

/// Line that identifies the appended bashrc snippet.
pub const BASHRC_MARKER: &str = "# hostkit: shell conveniences";

const DEFAULT_MC_CONFIG_DIR: &str = "config_files/mc/";

/// Run one phase of the tools playbook.
///
/// # Errors
///
/// Returns the first failing command or step.
pub async fn run_phase<S: RemoteSession>(rb: &mut Runbook<'_, S>, phase: &str) -> Result<()> {
    match phase {
        "shell" => shell(rb).await,
        "packages" => packages(rb).await,
        "mc-config" => mc_config(rb).await,
        other => Err(super::unknown_phase(PlaybookKind::Tools, other)),
    }
}

async fn shell<S: RemoteSession>(rb: &mut Runbook<'_, S>) -> Result<()> {
    rb.run("mkdir -p ~/tmp ~/bin").await?;
    rb.chdir(Some("~/tmp"));
    rb.require(&Step::new(
        "starship installer",
        Probe::exit_code("test -f install_starship.sh"),
        Action::command("curl -fsSL https://starship.rs/install.sh > install_starship.sh"),
    ))
    .await?;
    rb.require(&Step::new(
        "starship",
        Probe::exit_code("test -x ~/bin/starship"),
        Action::command("sh install_starship.sh --bin-dir ~/bin --yes"),
    ))
    .await?;
    rb.chdir(None);

    let snippet = rb.render("tools/bashrc.sh", rb.config())?;
    rb.append_once("bashrc snippet", BASHRC_MARKER, &snippet, "~/.bashrc")
        .await
}

async fn packages<S: RemoteSession>(rb: &mut Runbook<'_, S>) -> Result<()> {
    rb.run_all(&[
        "sudo apt update && sudo apt upgrade -y",
        "sudo apt install --assume-yes tmux rsync mc",
    ])
    .await
}

async fn mc_config<S: RemoteSession>(rb: &mut Runbook<'_, S>) -> Result<()> {
    let mut dir = rb
        .config()
        .get_or("tools::mc_config_dir", DEFAULT_MC_CONFIG_DIR)?;
    // rsync copies the directory's contents only with a trailing slash.
    if !dir.ends_with('/') {
        dir.push('/');
    }
    let local = PathBuf::from(&dir);
    if !rb.local_exists(&local) {
        rb.warn(format!("{dir} not found locally; skipping mc configuration"));
        return Ok(());
    }
    rb.run("mkdir -p ~/.config/mc").await?;
    rb.upload_path(&local, "~/.config/mc").await
}
