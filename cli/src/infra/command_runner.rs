//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` runs local programs (`ssh`, `rsync`) with tokio.
//! When a timeout is configured the child is killed explicitly on expiry.

use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::application::ports::CommandRunner;

/// Production `CommandRunner`.
///
/// Remote provisioning commands (apt upgrades, k3s installs) can run for
/// many minutes, so the default instance has no timeout. Short local
/// probes pass one through [`CommandRunner::run_with_timeout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner {
    timeout: Option<Duration>,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner whose `run` and `run_with_stdin` are bounded by `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        execute(program, args, None, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        execute(program, args, None, Some(timeout)).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output> {
        execute(program, args, Some(stdin), self.timeout).await
    }

    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("failed to run {program}"))
    }
}

async fn execute(
    program: &str,
    args: &[&str],
    stdin: Option<&[u8]>,
    timeout: Option<Duration>,
) -> Result<Output> {
    let mut child = tokio::process::Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    let stdin_handle = child.stdin.take();
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    tokio::select! {
        result = async {
            let (status, stdout, stderr, ()) = tokio::join!(
                child.wait(),
                read_all(stdout_handle),
                read_all(stderr_handle),
                async {
                    // Dropping the handle closes the pipe, which ends `cat > file`.
                    if let (Some(mut handle), Some(input)) = (stdin_handle, stdin) {
                        let _ = handle.write_all(input).await;
                    }
                },
            );
            Ok(Output {
                status: status.with_context(|| format!("waiting for {program}"))?,
                stdout,
                stderr,
            })
        } => result,
        () = expiry(timeout) => {
            let _ = child.kill().await;
            let secs = timeout.map_or(0, |t| t.as_secs());
            anyhow::bail!("{program} timed out after {secs}s")
        }
    }
}

async fn read_all(handle: Option<impl AsyncRead + Unpin>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = h.read_to_end(&mut buf).await;
    }
    buf
}

async fn expiry(timeout: Option<Duration>) {
    match timeout {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}
