//! Idempotent step execution: probe first, act only when needed.

use anyhow::{Context, Result};

use crate::application::ports::{ProgressReporter, RemoteSession, UploadSource};
use crate::domain::remote::{RemoteCommandResult, RunOptions};
use crate::domain::step::{Action, Step, StepOutcome};

/// Run `step` against `session`.
///
/// The probe runs first. When it reports the target state present, no
/// action command is issued and the outcome is
/// [`StepOutcome::AlreadySatisfied`]. Otherwise the action runs once; a
/// non-zero exit yields [`StepOutcome::Failed`] carrying the remote stderr.
///
/// # Errors
///
/// Transport failures propagate as errors; they are never reported as a
/// step outcome.
pub async fn ensure(
    session: &impl RemoteSession,
    step: &Step,
    reporter: &(impl ProgressReporter + ?Sized),
) -> Result<StepOutcome> {
    tracing::debug!(step = %step.name, probe = step.probe.command(), "probing");
    let probe = session
        .run(step.probe.command(), RunOptions::PROBE)
        .await
        .with_context(|| format!("probing step '{}'", step.name))?;

    if step.probe.indicates_present(&probe) {
        tracing::debug!(step = %step.name, "target state present");
        return Ok(StepOutcome::AlreadySatisfied);
    }

    let outcome = match &step.action {
        Action::Commands(commands) => run_commands(session, commands, reporter).await?,
        Action::Upload {
            content,
            remote_path,
            mode,
        } => {
            let result = session
                .upload(UploadSource::Content(content), remote_path, *mode)
                .await
                .with_context(|| format!("uploading {remote_path}"))?;
            if result.succeeded() {
                StepOutcome::Applied
            } else {
                StepOutcome::failed_from(&format!("upload {remote_path}"), &result)
            }
        }
    };
    tracing::debug!(step = %step.name, outcome = outcome.label(), "step finished");
    Ok(outcome)
}

async fn run_commands(
    session: &impl RemoteSession,
    commands: &[String],
    reporter: &(impl ProgressReporter + ?Sized),
) -> Result<StepOutcome> {
    for command in commands {
        let result = session.run(command, RunOptions::TOLERANT).await?;
        forward_output(reporter, &result);
        if !result.succeeded() {
            return Ok(StepOutcome::failed_from(command, &result));
        }
    }
    Ok(StepOutcome::Applied)
}

/// Echo the output of an uncaptured command through the reporter.
pub fn forward_output(reporter: &(impl ProgressReporter + ?Sized), result: &RemoteCommandResult) {
    for text in [result.stdout(), result.stderr()] {
        let text = text.trim_end();
        if !text.is_empty() {
            reporter.remote_output(text);
        }
    }
}
