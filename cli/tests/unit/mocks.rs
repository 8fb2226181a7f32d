//! Shared mock infrastructure for unit tests.
//!
//! [`MockRunner`] stands in for the local `ssh`/`rsync` binaries, so the
//! real `SshSession` and playbooks run against scripted process output.

#![allow(clippy::expect_used, dead_code)]

use std::cell::RefCell;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::time::Duration;

use anyhow::Result;
use hostkit_cli::application::ports::{CommandRunner, LocalArtifactWriter, ProgressReporter};
use hostkit_cli::domain::ssh::SshTarget;
use hostkit_cli::infra::ssh::SshSession;

// ── Output helpers ────────────────────────────────────────────────────────────

pub fn exit_output(code: i32, stdout: &[u8], stderr: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(code << 8),
        stdout: stdout.to_vec(),
        stderr: stderr.to_vec(),
    }
}

pub fn ok_output(stdout: &[u8]) -> Output {
    exit_output(0, stdout, b"")
}

// ── Mock: command runner ──────────────────────────────────────────────────────

/// One recorded process invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    /// The remote command of an `ssh` invocation (its last argument).
    pub fn remote_command(&self) -> &str {
        self.args.last().map_or("", String::as_str)
    }
}

/// Answers invocations whose joined arguments contain a pattern; the first
/// matching rule wins. Unmatched invocations exit 0 with no output.
#[derive(Default)]
pub struct MockRunner {
    rules: Vec<(String, i32, String, String)>,
    calls: RefCell<Vec<Invocation>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on(mut self, pattern: &str, exit: i32, stdout: &str, stderr: &str) -> Self {
        self.rules
            .push((pattern.into(), exit, stdout.into(), stderr.into()));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Remote commands sent through `ssh`, in order.
    pub fn remote_commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.program == "ssh")
            .map(|c| c.remote_command().to_string())
            .collect()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.remote_commands()
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }

    fn answer(&self, program: &str, args: &[&str], stdin: Option<&[u8]>) -> Output {
        self.calls.borrow_mut().push(Invocation {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            stdin: stdin.map(<[u8]>::to_vec),
        });
        let joined = args.join(" ");
        self.rules
            .iter()
            .find(|(pattern, ..)| joined.contains(pattern.as_str()))
            .map_or_else(
                || ok_output(b""),
                |(_, exit, stdout, stderr)| {
                    exit_output(*exit, stdout.as_bytes(), stderr.as_bytes())
                },
            )
    }
}

impl CommandRunner for MockRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        Ok(self.answer(program, args, None))
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<Output> {
        Ok(self.answer(program, args, None))
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output> {
        Ok(self.answer(program, args, Some(stdin)))
    }

    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        Ok(self.answer(program, args, None).status)
    }
}

impl CommandRunner for &MockRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        (**self).run(program, args).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        (**self).run_with_timeout(program, args, timeout).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output> {
        (**self).run_with_stdin(program, args, stdin).await
    }

    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        (**self).run_status(program, args).await
    }
}

/// A session on `198.51.100.4` as `deploy`, driven by `runner`.
pub fn session(runner: &MockRunner) -> SshSession<&MockRunner> {
    SshSession::new(runner, SshTarget::new("198.51.100.4", "deploy"))
}

// ── Mock: reporter and local filesystem ───────────────────────────────────────

#[derive(Default)]
pub struct NullReporter {
    pub warnings: RefCell<Vec<String>>,
}

impl ProgressReporter for NullReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
    fn remote_output(&self, _: &str) {}
}

/// Local filesystem where nothing exists and writes are recorded.
#[derive(Default)]
pub struct MemoryFs {
    pub written: RefCell<Vec<(PathBuf, Vec<u8>, bool)>>,
}

impl LocalArtifactWriter for MemoryFs {
    fn exists(&self, _: &Path) -> bool {
        false
    }

    fn create_dir_all(&self, _: &Path) -> Result<()> {
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &[u8], executable: bool) -> Result<()> {
        self.written
            .borrow_mut()
            .push((path.to_path_buf(), content.to_vec(), executable));
        Ok(())
    }
}
