//! `hostkit exec`: run a command on the configured host.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::RemoteSession;
use crate::domain::ssh::SshTarget;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::ssh::SshSession;

/// Arguments for the exec command.
#[derive(Args)]
#[command(trailing_var_arg = true)]
pub struct ExecArgs {
    /// Working directory on the host
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Command and arguments, interpreted by the remote shell
    #[arg(required = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Run a command on the host with stdio passed through.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete or ssh cannot reach
/// the host.
pub async fn run(app: &AppContext, args: &ExecArgs) -> Result<ExitCode> {
    let (_, config) = super::load_config(app)?;
    let target = SshTarget::from_config(&config)?;
    let mut session = SshSession::new(TokioCommandRunner::new(), target);
    session.set_working_directory(args.cwd.as_deref());

    let code = session.run_streaming(&args.command.join(" ")).await?;
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
