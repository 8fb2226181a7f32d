//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;

use anyhow::Result;

pub use crate::domain::config::ConfigSupplier;
use crate::domain::remote::{RemoteCommandResult, RunOptions, WriteMode};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations use the instance's configured default timeout, or
    /// none at all.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
    /// Run a program with inherited stdio and return only its exit status.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<std::process::ExitStatus>;
}

// ── Remote Session Port ───────────────────────────────────────────────────────

/// Source of an upload.
#[derive(Debug, Clone, Copy)]
pub enum UploadSource<'a> {
    /// In-memory content.
    Content(&'a [u8]),
    /// A local file or directory (copied recursively).
    LocalPath(&'a Path),
}

/// A persistent shell connection to one host.
///
/// Transport failures (connection lost, authentication refused) are returned
/// as `Err` wrapping [`crate::domain::SessionError::Transport`]. Non-zero
/// exits are returned as data, except for `run` without
/// `tolerate_failure`, which raises
/// [`crate::domain::SessionError::CommandFailed`].
///
/// The session is supplied by the caller and outlives every step. Mutating
/// methods take `&mut self`, so only the single owner can change the
/// working directory or environment.
#[allow(async_fn_in_trait)]
pub trait RemoteSession {
    /// Host name shown in logs and summaries.
    fn host(&self) -> &str;

    /// Run `command` in the session's working directory and environment.
    async fn run(&self, command: &str, options: RunOptions) -> Result<RemoteCommandResult>;

    /// Write `source` to `remote_path`.
    async fn upload(
        &self,
        source: UploadSource<'_>,
        remote_path: &str,
        mode: WriteMode,
    ) -> Result<RemoteCommandResult>;

    /// Copy `remote_path` to `local_path`.
    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<RemoteCommandResult>;

    /// Change (or with `None`, reset) the working directory for later commands.
    fn set_working_directory(&mut self, path: Option<&str>);

    /// Export `name=value` for later commands.
    fn set_environment_variable(&mut self, name: &str, value: &str);
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Forward output of a remote command that was not captured.
    fn remote_output(&self, text: &str);
}

// ── Asset and Filesystem Ports ────────────────────────────────────────────────

/// Abstracts access to the templates compiled into the binary.
pub trait AssetSource {
    /// Raw bytes of the embedded asset at `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if no such asset exists.
    fn get_asset(&self, name: &str) -> Result<&'static [u8]>;
}

/// Abstracts the local filesystem for artifacts (certificate backups,
/// restore scripts) and the local directories a playbook uploads.
pub trait LocalArtifactWriter {
    /// Whether `path` exists locally.
    fn exists(&self, path: &Path) -> bool;
    /// Create `dir` and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_dir_all(&self, dir: &Path) -> Result<()>;
    /// Write `content` to `path`, setting the executable bit when `executable`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write_file(&self, path: &Path, content: &[u8], executable: bool) -> Result<()>;
}
