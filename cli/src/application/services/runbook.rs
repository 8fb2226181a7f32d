//! Runbook: the operations a playbook composes, bound to one session.
//!
//! A [`Runbook`] borrows the caller's session for the whole run, reports
//! progress, and records every idempotent step and wait in a
//! [`RunSummary`].

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{
    AssetSource, LocalArtifactWriter, ProgressReporter, RemoteSession, UploadSource,
};
use crate::application::services::{poller, step_runner};
use crate::domain::config::{ConfigSupplier, DeployConfig};
use crate::domain::edit::{self, Replacement};
use crate::domain::error::StepError;
use crate::domain::poll::{PollResult, PollSpec};
use crate::domain::remote::{RemoteCommandResult, RunOptions, WriteMode};
use crate::domain::shell::{quote, quote_path};
use crate::domain::step::{Action, Probe, Step, StepOutcome};
use crate::domain::summary::RunSummary;
use crate::domain::template;

/// Playbook execution context.
pub struct Runbook<'a, S: RemoteSession> {
    session: &'a mut S,
    config: &'a DeployConfig,
    assets: &'a dyn AssetSource,
    local: &'a dyn LocalArtifactWriter,
    reporter: &'a dyn ProgressReporter,
    summary: RunSummary,
}

impl<'a, S: RemoteSession> Runbook<'a, S> {
    pub fn new(
        session: &'a mut S,
        config: &'a DeployConfig,
        assets: &'a dyn AssetSource,
        local: &'a dyn LocalArtifactWriter,
        reporter: &'a dyn ProgressReporter,
        playbook: &str,
    ) -> Self {
        let summary = RunSummary::new(playbook, session.host());
        Self {
            session,
            config,
            assets,
            local,
            reporter,
            summary,
        }
    }

    #[must_use]
    pub fn config(&self) -> &'a DeployConfig {
        self.config
    }

    #[must_use]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Finish the run and hand back its summary.
    #[must_use]
    pub fn into_summary(mut self) -> RunSummary {
        self.summary.finish();
        self.summary
    }

    /// Mark the start of a phase.
    pub fn begin_phase(&mut self, phase: &str) {
        tracing::info!(phase, host = self.session.host(), "phase started");
        self.reporter.step(&format!("phase {phase}"));
        self.summary.phases.push(phase.to_string());
    }

    /// Informational progress line.
    pub fn note(&self, message: &str) {
        self.reporter.step(message);
    }

    pub fn success(&self, message: &str) {
        self.reporter.success(message);
    }

    /// Record a degraded-but-continuing condition.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message);
        self.reporter.warn(&message);
        self.summary.warn(message);
    }

    // ── Plain commands ────────────────────────────────────────────────────

    /// Run a command that must succeed, echoing its output.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::SessionError::CommandFailed`] on a non-zero
    /// exit, and transport errors.
    pub async fn run(&mut self, command: &str) -> Result<RemoteCommandResult> {
        let result = self.session.run(command, RunOptions::CHECKED).await?;
        step_runner::forward_output(self.reporter, &result);
        Ok(result)
    }

    /// Run each command in order; stop at the first failure.
    ///
    /// # Errors
    ///
    /// See [`Self::run`].
    pub async fn run_all(&mut self, commands: &[&str]) -> Result<()> {
        for command in commands {
            self.run(command).await?;
        }
        Ok(())
    }

    /// Run a command whose failure is only a warning.
    ///
    /// # Errors
    ///
    /// Returns transport errors.
    pub async fn run_tolerant(&mut self, command: &str) -> Result<RemoteCommandResult> {
        let result = self.session.run(command, RunOptions::TOLERANT).await?;
        step_runner::forward_output(self.reporter, &result);
        if !result.succeeded() {
            self.warn(format!("`{command}` exited with code {}", result.exit_code()));
        }
        Ok(result)
    }

    /// Run a read-only command and capture its output without echoing it.
    ///
    /// # Errors
    ///
    /// Returns transport errors.
    pub async fn probe(&self, command: &str) -> Result<RemoteCommandResult> {
        self.session.run(command, RunOptions::PROBE).await
    }

    // ── Idempotent steps ──────────────────────────────────────────────────

    /// Run an idempotent step and record its outcome.
    ///
    /// # Errors
    ///
    /// Returns transport errors. A failed action is an outcome, not an error.
    pub async fn ensure(&mut self, step: &Step) -> Result<StepOutcome> {
        let outcome = step_runner::ensure(&*self.session, step, self.reporter).await?;
        match &outcome {
            StepOutcome::AlreadySatisfied => self
                .reporter
                .success(&format!("{}: already satisfied", step.name)),
            StepOutcome::Applied => self.reporter.success(&format!("{}: applied", step.name)),
            StepOutcome::Failed { reason } => self
                .reporter
                .warn(&format!("{}: failed: {}", step.name, reason.trim_end())),
        }
        self.summary.record_step(&step.name, outcome.clone());
        Ok(outcome)
    }

    /// Run an idempotent step that later steps depend on.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] when the step's action fails.
    pub async fn require(&mut self, step: &Step) -> Result<()> {
        match self.ensure(step).await? {
            StepOutcome::Failed { reason } => Err(StepError::Failed {
                step: step.name.clone(),
                reason,
            }
            .into()),
            StepOutcome::AlreadySatisfied | StepOutcome::Applied => Ok(()),
        }
    }

    /// Poll until ready or out of attempts, recording the result.
    /// A timeout is recorded as a warning and returned, not raised.
    ///
    /// # Errors
    ///
    /// Returns transport errors.
    pub async fn wait(&mut self, name: &str, spec: &PollSpec) -> Result<PollResult> {
        self.reporter.step(&format!(
            "waiting for {name} (up to {}s)",
            spec.budget().as_secs()
        ));
        let result = poller::wait_until(&*self.session, spec, self.reporter).await?;
        match result {
            PollResult::Ready { attempts } => self
                .reporter
                .success(&format!("{name} ready after {attempts} attempt(s)")),
            PollResult::TimedOut { attempts } => self.warn(format!(
                "{name} not ready after {attempts} attempts; continuing"
            )),
        }
        self.summary.record_wait(name, result);
        Ok(result)
    }

    // ── Files ─────────────────────────────────────────────────────────────

    /// Render the embedded template `name` against `vars`.
    /// YAML templates are checked for syntax after rendering.
    ///
    /// # Errors
    ///
    /// Returns template errors for missing assets, unknown keys or bad YAML.
    pub fn render(&self, name: &str, vars: &impl ConfigSupplier) -> Result<String> {
        let raw = self.assets.get_asset(name)?;
        let text =
            std::str::from_utf8(raw).with_context(|| format!("template {name} is not UTF-8"))?;
        let rendered = template::render(name, text, vars)?;
        if name.ends_with(".yaml") || name.ends_with(".yml") {
            template::validate_yaml(name, &rendered)?;
        }
        Ok(rendered)
    }

    /// Render a template and upload it, skipping the upload when the remote
    /// file already has the same content.
    ///
    /// # Errors
    ///
    /// Returns template errors, and [`StepError::Failed`] if the upload fails.
    pub async fn push_template(
        &mut self,
        name: &str,
        remote_path: &str,
        vars: &impl ConfigSupplier,
    ) -> Result<()> {
        let rendered = self.render(name, vars)?;
        self.push_content(remote_path, rendered.into_bytes()).await
    }

    /// Upload `content` to `remote_path` unless it is already there.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] if the upload fails.
    pub async fn push_content(&mut self, remote_path: &str, content: Vec<u8>) -> Result<()> {
        let digest = template::sha256_hex(&content);
        let step = Step::new(
            format!("upload {remote_path}"),
            Probe::stdout_contains(
                format!("sha256sum {} 2>/dev/null", quote_path(remote_path)),
                digest,
            ),
            Action::Upload {
                content,
                remote_path: remote_path.to_string(),
                mode: WriteMode::Overwrite,
            },
        );
        self.require(&step).await
    }

    /// Append `content` to `remote_path` unless `marker` already occurs in it.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] if the append fails.
    pub async fn append_once(
        &mut self,
        name: &str,
        marker: &str,
        content: &str,
        remote_path: &str,
    ) -> Result<()> {
        let step = Step::new(
            name,
            Probe::exit_code(format!(
                "grep -qF -- {} {}",
                quote(marker),
                quote_path(remote_path)
            )),
            Action::Upload {
                content: content.as_bytes().to_vec(),
                remote_path: remote_path.to_string(),
                mode: WriteMode::Append,
            },
        );
        self.require(&step).await
    }

    /// Apply literal replacements to a remote file in place.
    /// The file is rewritten only when at least one pair changes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a pattern is missing,
    /// or the rewrite fails.
    pub async fn edit_file(
        &mut self,
        remote_path: &str,
        replacements: &[Replacement],
    ) -> Result<StepOutcome> {
        let name = format!("edit {remote_path}");
        let current = self.probe(&format!("cat {}", quote_path(remote_path))).await?;
        if !current.succeeded() {
            anyhow::bail!(StepError::Failed {
                step: name,
                reason: StepOutcome::failed_from(&format!("cat {remote_path}"), &current)
                    .to_string(),
            });
        }
        let plan = edit::apply(remote_path, current.stdout(), replacements)?;
        let outcome = if plan.changed() {
            let result = self
                .session
                .upload(
                    UploadSource::Content(plan.content.as_bytes()),
                    remote_path,
                    WriteMode::Overwrite,
                )
                .await?;
            if result.succeeded() {
                StepOutcome::Applied
            } else {
                StepOutcome::failed_from(&format!("upload {remote_path}"), &result)
            }
        } else {
            StepOutcome::AlreadySatisfied
        };
        tracing::debug!(
            path = remote_path,
            replaced = plan.replaced,
            already_applied = plan.already_applied,
            "edit planned"
        );
        self.summary.record_step(&name, outcome.clone());
        if let StepOutcome::Failed { reason } = outcome {
            return Err(StepError::Failed { step: name, reason }.into());
        }
        self.reporter.success(&format!("{name}: {}", outcome.label()));
        Ok(outcome)
    }

    /// Copy a local file or directory to the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the local path is missing or the copy fails.
    pub async fn upload_path(&mut self, local_path: &Path, remote_path: &str) -> Result<()> {
        if !self.local.exists(local_path) {
            anyhow::bail!("local path {} does not exist", local_path.display());
        }
        let result = self
            .session
            .upload(
                UploadSource::LocalPath(local_path),
                remote_path,
                WriteMode::Overwrite,
            )
            .await?;
        step_runner::forward_output(self.reporter, &result);
        if !result.succeeded() {
            anyhow::bail!(
                "copying {} to {remote_path} failed: {}",
                local_path.display(),
                result.stderr().trim_end()
            );
        }
        self.reporter.success(&format!(
            "copied {} to {remote_path}",
            local_path.display()
        ));
        Ok(())
    }

    /// Copy a remote file to `local_path`. When `required` is false a
    /// failure is recorded as a warning and `Ok(false)` is returned.
    ///
    /// # Errors
    ///
    /// Returns transport errors, and a failed required download.
    pub async fn download(
        &mut self,
        remote_path: &str,
        local_path: &Path,
        required: bool,
    ) -> Result<bool> {
        let result = self.session.download(remote_path, local_path).await?;
        if result.succeeded() {
            return Ok(true);
        }
        let message = format!(
            "downloading {remote_path} failed: {}",
            result.stderr().trim_end()
        );
        if required {
            anyhow::bail!(message);
        }
        self.warn(message);
        Ok(false)
    }

    /// Whether a local path exists.
    #[must_use]
    pub fn local_exists(&self, path: &Path) -> bool {
        self.local.exists(path)
    }

    /// Create a local directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create_local_dir(&self, dir: &Path) -> Result<()> {
        self.local.create_dir_all(dir)
    }

    /// Write a local artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_local(&self, path: &Path, content: &[u8], executable: bool) -> Result<()> {
        self.local.write_file(path, content, executable)
    }

    // ── Session state ─────────────────────────────────────────────────────

    /// Change the working directory for later commands; `None` resets it.
    pub fn chdir(&mut self, dir: Option<&str>) {
        self.session.set_working_directory(dir);
    }

    /// Export a variable for later commands.
    pub fn set_env(&mut self, name: &str, value: &str) {
        self.session.set_environment_variable(name, value);
    }
}
