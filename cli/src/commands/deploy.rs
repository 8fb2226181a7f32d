//! `hostkit deploy`: run a playbook against the configured host.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::playbooks::run_playbook;
use crate::application::services::prerequisites::check_prerequisites;
use crate::application::services::runbook::Runbook;
use crate::domain::playbook::{PlaybookKind, select_phases};
use crate::domain::ssh::SshTarget;
use crate::infra::assets::EmbeddedAssets;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::fs::LocalFs;
use crate::infra::ssh::SshSession;
use crate::output::json;

/// Arguments for the deploy command.
#[derive(Args)]
pub struct DeployArgs {
    /// Playbook to run (tools, mattermost, nextcloud)
    pub playbook: PlaybookKind,

    /// Run only these phases, in playbook order (repeatable or comma-separated)
    #[arg(long = "phase", value_name = "PHASE", value_delimiter = ',')]
    pub phases: Vec<String>,
}

/// Run the deploy command.
///
/// # Errors
///
/// Returns an error if validation fails, the user cancels, or a phase fails.
pub async fn run(app: &AppContext, args: &DeployArgs) -> Result<ExitCode> {
    let kind = args.playbook;
    let phases = select_phases(kind, &args.phases)?;
    let (path, config) = super::load_config(app)?;
    tracing::info!(playbook = %kind, config = %path.display(), "deploy requested");

    let runner = TokioCommandRunner::new();
    check_prerequisites(&runner, &config, Some(kind))
        .await?
        .ensure_ok()?;
    let target = SshTarget::from_config(&config)?;

    let prompt = format!(
        "Run {kind} ({}) on {}?",
        phases.join(", "),
        target.destination()
    );
    if !app.confirm(&prompt, true)? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut session = SshSession::new(runner, target);
    let reporter = app.reporter();
    let mut runbook = Runbook::new(
        &mut session,
        &config,
        &EmbeddedAssets,
        &LocalFs,
        &reporter,
        kind.name(),
    );

    let outcome = tokio::select! {
        result = run_playbook(&mut runbook, kind, &phases) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!(
            "interrupted; the host may be partially provisioned. Re-run to continue."
        )),
    };
    let summary = runbook.into_summary();
    let tally = summary.tally();
    tracing::info!(
        applied = tally.applied,
        already_satisfied = tally.already_satisfied,
        failed = tally.failed,
        "deploy finished"
    );

    if let Err(err) = outcome {
        if !app.is_json() {
            app.human().render_summary(&summary);
        }
        return Err(err).with_context(|| format!("{kind} on {} failed", summary.host));
    }

    if app.is_json() {
        println!("{}", json::format_value(&summary)?);
    } else {
        app.human().render_summary(&summary);
    }
    if tally.failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
