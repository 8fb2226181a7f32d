//! Playbooks: ordered phases of runbook operations for one host.
//!
//! Each playbook module exposes `run_phase`, dispatched here by name. Phase
//! names come from [`PlaybookKind::phases`], so an unknown name is a bug
//! rather than user input.

pub mod certificates;
pub mod mattermost;
pub mod nextcloud;
pub mod tools;

use anyhow::Result;

use crate::application::ports::RemoteSession;
use crate::application::services::runbook::Runbook;
use crate::domain::playbook::PlaybookKind;

/// Run `phases` of `kind` in order. The first error aborts the run.
///
/// # Errors
///
/// Returns the error of the first failing phase.
pub async fn run_playbook<S: RemoteSession>(
    rb: &mut Runbook<'_, S>,
    kind: PlaybookKind,
    phases: &[&str],
) -> Result<()> {
    let os = rb.probe("lsb_release -ds").await?;
    if os.succeeded() {
        rb.note(&format!("remote system: {}", os.stdout().trim()));
    }
    for phase in phases {
        rb.begin_phase(phase);
        match kind {
            PlaybookKind::Tools => tools::run_phase(rb, phase).await?,
            PlaybookKind::Mattermost => mattermost::run_phase(rb, phase).await?,
            PlaybookKind::Nextcloud => nextcloud::run_phase(rb, phase).await?,
        }
    }
    Ok(())
}

fn unknown_phase(kind: PlaybookKind, phase: &str) -> anyhow::Error {
    anyhow::anyhow!("playbook {kind} has no phase '{phase}'")
}
