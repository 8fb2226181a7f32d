//! `RemoteSession` over the system OpenSSH client.
//!
//! Every command is a fresh `ssh` invocation; the working directory and
//! environment live in a [`SessionContext`] and are prefixed to each
//! command. File transfer uses `cat` over ssh for in-memory content and
//! `rsync -e ssh` for local paths and downloads.

use std::path::Path;
use std::process::Output;

use anyhow::Result;

use crate::application::ports::{CommandRunner, RemoteSession, UploadSource};
use crate::domain::error::SessionError;
use crate::domain::remote::{RemoteCommandResult, RunOptions, WriteMode};
use crate::domain::shell::{SessionContext, quote, quote_path};
use crate::domain::ssh::SshTarget;

/// Exit code ssh reserves for its own failures (connection, auth).
pub const SSH_TRANSPORT_EXIT: i32 = 255;

/// A session against one [`SshTarget`].
pub struct SshSession<R: CommandRunner> {
    runner: R,
    target: SshTarget,
    context: SessionContext,
}

impl<R: CommandRunner> SshSession<R> {
    pub fn new(runner: R, target: SshTarget) -> Self {
        Self {
            runner,
            target,
            context: SessionContext::default(),
        }
    }

    /// Options shared by `ssh` and the `rsync -e` transport.
    fn ssh_options(&self) -> Vec<String> {
        let mut opts = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.target.connect_timeout_secs),
            "-p".to_string(),
            self.target.port.to_string(),
        ];
        if let Some(identity) = &self.target.identity_file {
            opts.push("-i".to_string());
            opts.push(identity.clone());
        }
        opts
    }

    /// Full `ssh` argument list running `remote_command` on the target.
    #[must_use]
    pub fn ssh_args(&self, remote_command: &str) -> Vec<String> {
        let mut args = self.ssh_options();
        args.push(self.target.destination());
        args.push(remote_command.to_string());
        args
    }

    /// `rsync` argument list copying `source` to `dest`.
    #[must_use]
    pub fn rsync_args(&self, source: &str, dest: &str) -> Vec<String> {
        let transport = std::iter::once("ssh".to_string())
            .chain(self.ssh_options().iter().map(|o| quote(o)))
            .collect::<Vec<_>>()
            .join(" ");
        vec![
            "-az".to_string(),
            "-e".to_string(),
            transport,
            source.to_string(),
            dest.to_string(),
        ]
    }

    /// `user@host:path` for rsync. rsync resolves relative remote paths
    /// against the login directory, so a leading `~/` is dropped.
    #[must_use]
    pub fn remote_spec(&self, remote_path: &str) -> String {
        let path = match remote_path {
            "~" | "~/" => ".",
            p => p.strip_prefix("~/").unwrap_or(p),
        };
        format!("{}:{path}", self.target.destination())
    }

    /// Run `command` with inherited stdio and return its exit code.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if ssh itself fails.
    pub async fn run_streaming(&self, command: &str) -> Result<i32> {
        let wrapped = self.context.wrap(command);
        tracing::debug!(host = %self.target.host, command = %wrapped, "remote command (streamed)");
        let args = self.ssh_args(&wrapped);
        let status = self
            .runner
            .run_status("ssh", &as_strs(&args))
            .await
            .map_err(|e| self.transport(format!("{e:#}")))?;
        match status.code() {
            Some(SSH_TRANSPORT_EXIT) => Err(self
                .transport(format!("ssh exited with code {SSH_TRANSPORT_EXIT}"))
                .into()),
            Some(code) => Ok(code),
            None => Err(self.transport("ssh was terminated by a signal".into()).into()),
        }
    }

    fn transport(&self, reason: String) -> SessionError {
        SessionError::Transport {
            host: self.target.host.clone(),
            reason,
        }
    }

    /// Convert process output, treating ssh's own exit code as a transport
    /// failure. A remote command that itself exits 255 is indistinguishable.
    fn classify(&self, tool: &str, output: &Output) -> Result<RemoteCommandResult, SessionError> {
        let Some(code) = output.status.code() else {
            return Err(self.transport(format!("{tool} was terminated by a signal")));
        };
        if code == SSH_TRANSPORT_EXIT {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = if stderr.trim().is_empty() {
                format!("{tool} exited with code {SSH_TRANSPORT_EXIT}")
            } else {
                stderr.trim().to_string()
            };
            return Err(self.transport(reason));
        }
        Ok(RemoteCommandResult::from_bytes(
            code,
            &output.stdout,
            &output.stderr,
        ))
    }

    async fn rsync(&self, source: &str, dest: &str) -> Result<RemoteCommandResult> {
        tracing::debug!(host = %self.target.host, source, dest, "rsync");
        let args = self.rsync_args(source, dest);
        let output = self
            .runner
            .run("rsync", &as_strs(&args))
            .await
            .map_err(|e| self.transport(format!("{e:#}")))?;
        Ok(self.classify("rsync", &output)?)
    }
}

impl<R: CommandRunner> RemoteSession for SshSession<R> {
    fn host(&self) -> &str {
        &self.target.host
    }

    async fn run(&self, command: &str, options: RunOptions) -> Result<RemoteCommandResult> {
        let wrapped = self.context.wrap(command);
        tracing::debug!(
            host = %self.target.host,
            cwd = self.context.working_dir().unwrap_or("~"),
            command,
            "remote command"
        );
        let args = self.ssh_args(&wrapped);
        let output = self
            .runner
            .run("ssh", &as_strs(&args))
            .await
            .map_err(|e| self.transport(format!("{e:#}")))?;
        let result = self.classify("ssh", &output)?;
        tracing::trace!(exit_code = result.exit_code(), stdout = result.stdout(), "remote result");

        if !options.tolerate_failure && !result.succeeded() {
            return Err(SessionError::CommandFailed {
                command: command.to_string(),
                exit_code: result.exit_code(),
                stderr: result.stderr().to_string(),
            }
            .into());
        }
        Ok(result)
    }

    async fn upload(
        &self,
        source: UploadSource<'_>,
        remote_path: &str,
        mode: WriteMode,
    ) -> Result<RemoteCommandResult> {
        match source {
            UploadSource::Content(content) => {
                let command = self
                    .context
                    .wrap(&format!("cat {} {}", mode.redirect(), quote_path(remote_path)));
                tracing::debug!(
                    host = %self.target.host,
                    path = remote_path,
                    bytes = content.len(),
                    "upload"
                );
                let args = self.ssh_args(&command);
                let output = self
                    .runner
                    .run_with_stdin("ssh", &as_strs(&args), content)
                    .await
                    .map_err(|e| self.transport(format!("{e:#}")))?;
                Ok(self.classify("ssh", &output)?)
            }
            UploadSource::LocalPath(local) => {
                anyhow::ensure!(
                    mode == WriteMode::Overwrite,
                    "appending a local path is not supported"
                );
                self.rsync(&local.to_string_lossy(), &self.remote_spec(remote_path))
                    .await
            }
        }
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<RemoteCommandResult> {
        self.rsync(&self.remote_spec(remote_path), &local_path.to_string_lossy())
            .await
    }

    fn set_working_directory(&mut self, path: Option<&str>) {
        self.context = std::mem::take(&mut self.context).with_working_dir(path);
    }

    fn set_environment_variable(&mut self, name: &str, value: &str) {
        self.context = std::mem::take(&mut self.context).with_env(name, value);
    }
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}
