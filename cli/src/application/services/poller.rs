//! Bounded polling of a remote status command.

use anyhow::{Context, Result};

use crate::application::ports::{ProgressReporter, RemoteSession};
use crate::domain::poll::{PollResult, PollSpec};
use crate::domain::remote::RunOptions;

/// Probe `spec.status_command` until its trimmed stdout equals the target.
///
/// Issues at most `max_attempts` probes and sleeps `delay` between
/// consecutive probes, never after the last one. Returns
/// [`PollResult::TimedOut`] once the budget is spent; `max_attempts == 0`
/// times out without probing. Dropping the future cancels the wait.
///
/// # Errors
///
/// Transport failures propagate immediately.
pub async fn wait_until(
    session: &impl RemoteSession,
    spec: &PollSpec,
    reporter: &(impl ProgressReporter + ?Sized),
) -> Result<PollResult> {
    for attempt in 1..=spec.max_attempts {
        let result = session
            .run(&spec.status_command, RunOptions::PROBE)
            .await
            .with_context(|| format!("polling `{}`", spec.status_command))?;
        if spec.matches(&result) {
            return Ok(PollResult::Ready { attempts: attempt });
        }
        tracing::debug!(
            attempt,
            status = PollSpec::extract_status(&result),
            target = %spec.target,
            "not ready"
        );
        if attempt < spec.max_attempts {
            reporter.step(&format!(
                "not ready yet, retrying in {}s ({attempt}/{})",
                spec.delay.as_secs(),
                spec.max_attempts
            ));
            tokio::time::sleep(spec.delay).await;
        }
    }
    Ok(PollResult::TimedOut {
        attempts: spec.max_attempts,
    })
}
