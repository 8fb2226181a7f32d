//! `hostkit doctor`: local prerequisites and remote reachability.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{CommandRunner, RemoteSession};
use crate::application::services::prerequisites::check_prerequisites;
use crate::domain::config::DeployConfig;
use crate::domain::health::{DoctorReport, RemoteCheck};
use crate::domain::playbook::PlaybookKind;
use crate::domain::remote::RunOptions;
use crate::domain::ssh::SshTarget;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::ssh::SshSession;
use crate::output::{json, progress};

/// Arguments for the doctor command.
#[derive(Args)]
pub struct DoctorArgs {
    /// Also check the configuration keys this playbook needs
    pub playbook: Option<PlaybookKind>,
}

/// Run the doctor command.
///
/// # Errors
///
/// Returns an error if a configuration value is malformed or JSON
/// serialization fails.
pub async fn run(app: &AppContext, args: &DoctorArgs) -> Result<ExitCode> {
    let config = match super::load_config(app) {
        Ok((_, config)) => config,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "no usable configuration");
            if !app.is_json() {
                app.output.warn(&format!("{err:#}"));
            }
            DeployConfig::default()
        }
    };

    let runner = TokioCommandRunner::new();
    let local = check_prerequisites(&runner, &config, args.playbook).await?;

    let remote = match SshTarget::from_config(&config) {
        Ok(target) => {
            let spinner = progress::maybe_spinner(
                app.output.show_progress() && !app.is_json(),
                &format!("Contacting {}...", target.host),
            );
            let check = check_remote(&SshSession::new(runner, target)).await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            Some(check)
        }
        Err(err) => {
            tracing::debug!(error = %err, "remote check skipped");
            None
        }
    };

    let report = DoctorReport { local, remote };
    if app.is_json() {
        println!("{}", json::format_value(&report)?);
    } else {
        app.human().render_doctor(&report, app.verbose > 0);
    }
    Ok(if report.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn check_remote<R: CommandRunner>(session: &SshSession<R>) -> RemoteCheck {
    let host = session.host().to_string();
    match session.run("true", RunOptions::PROBE).await {
        Ok(result) if result.succeeded() => {
            let distribution = match session.run("lsb_release -ds", RunOptions::PROBE).await {
                Ok(os) if os.succeeded() => Some(os.stdout().trim().to_string()),
                _ => None,
            };
            RemoteCheck {
                host,
                reachable: true,
                distribution,
                error: None,
            }
        }
        Ok(result) => RemoteCheck {
            host,
            reachable: false,
            distribution: None,
            error: Some(format!("'true' exited with code {}", result.exit_code())),
        },
        Err(err) => RemoteCheck {
            host,
            reachable: false,
            distribution: None,
            error: Some(format!("{err:#}")),
        },
    }
}
