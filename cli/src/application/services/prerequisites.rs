//! Startup validation: local tools and configuration keys.
//!
//! Runs before any connection is opened, so a missing `rsync` or a typo in
//! `config.toml` fails before the first remote command.

use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{CommandRunner, ConfigSupplier};
use crate::domain::health::{
    PrerequisiteChecks, RSYNC_MIN_VERSION, SSH_MIN_VERSION, parse_rsync_version,
    parse_ssh_version, tool_check,
};
use crate::domain::playbook::{self, PlaybookKind};

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Check `ssh`, `rsync` and, when `kind` is given, the playbook's keys.
///
/// # Errors
///
/// Returns an error only if a present configuration key is malformed;
/// missing tools and keys are reported in the returned checks.
pub async fn check_prerequisites(
    runner: &impl CommandRunner,
    config: &impl ConfigSupplier,
    kind: Option<PlaybookKind>,
) -> Result<PrerequisiteChecks> {
    // `ssh -V` prints its banner on stderr.
    let ssh_out = version_output(runner, "ssh", &["-V"]).await;
    let rsync_out = version_output(runner, "rsync", &["--version"]).await;

    let missing_keys = match kind {
        Some(kind) => playbook::missing_keys(config, kind)?,
        None => playbook::SESSION_KEYS
            .iter()
            .filter(|k| matches!(config.lookup(k), Ok(None)))
            .map(|k| (*k).to_string())
            .collect(),
    };

    Ok(PrerequisiteChecks {
        ssh: tool_check("ssh", ssh_out.as_deref(), parse_ssh_version, &SSH_MIN_VERSION),
        rsync: tool_check(
            "rsync",
            rsync_out.as_deref(),
            parse_rsync_version,
            &RSYNC_MIN_VERSION,
        ),
        missing_keys,
    })
}

/// Combined stdout and stderr of a version command, or `None` when the
/// tool could not be run.
async fn version_output(
    runner: &impl CommandRunner,
    program: &str,
    args: &[&str],
) -> Option<String> {
    match runner.run_with_timeout(program, args, VERSION_TIMEOUT).await {
        Ok(output) if output.status.success() => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            Some(text)
        }
        Ok(output) => {
            tracing::debug!(program, status = %output.status, "version command failed");
            None
        }
        Err(e) => {
            tracing::debug!(program, error = %e, "version command could not run");
            None
        }
    }
}
