//! Idempotent step definitions: probe, action and outcome.
//!
//! Pure data only. Execution lives in
//! `crate::application::services::step_runner`.

use std::fmt;

use serde::Serialize;

use crate::domain::remote::{RemoteCommandResult, WriteMode};

/// How a probe result is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Presence {
    /// Target state is present iff the probe exits 0.
    ExitCodeZero,
    /// Target state is present iff stdout contains the needle.
    /// The exit code is ignored.
    StdoutContains(String),
}

/// A read-only remote check for the target state of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    command: String,
    presence: Presence,
}

impl Probe {
    /// Present when `command` exits 0, e.g. `kubectl get namespace mattermost`.
    #[must_use]
    pub fn exit_code(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            presence: Presence::ExitCodeZero,
        }
    }

    /// Present when the output of `command` contains `needle`,
    /// e.g. `helm list -n cert-manager` containing `cert-manager`.
    #[must_use]
    pub fn stdout_contains(command: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            presence: Presence::StdoutContains(needle.into()),
        }
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether `result` says the target state already exists.
    #[must_use]
    pub fn indicates_present(&self, result: &RemoteCommandResult) -> bool {
        match &self.presence {
            Presence::ExitCodeZero => result.succeeded(),
            Presence::StdoutContains(needle) => result.stdout().contains(needle.as_str()),
        }
    }
}

/// The operation that establishes the target state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Commands run in order; the first failure ends the action.
    Commands(Vec<String>),
    /// Write `content` to `remote_path`.
    Upload {
        content: Vec<u8>,
        remote_path: String,
        mode: WriteMode,
    },
}

impl Action {
    /// A single-command action.
    #[must_use]
    pub fn command(command: impl Into<String>) -> Self {
        Self::Commands(vec![command.into()])
    }
}

/// A probe paired with the action it guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub probe: Probe,
    pub action: Action,
}

impl Step {
    #[must_use]
    pub fn new(name: impl Into<String>, probe: Probe, action: Action) -> Self {
        Self {
            name: name.into(),
            probe,
            action,
        }
    }
}

/// Three-way result of running a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    AlreadySatisfied,
    Applied,
    Failed { reason: String },
}

impl StepOutcome {
    /// Failure reason for `result`: its stderr verbatim, or a description of
    /// the exit when stderr is empty.
    #[must_use]
    pub fn failed_from(command: &str, result: &RemoteCommandResult) -> Self {
        let reason = if result.stderr().trim().is_empty() {
            format!("`{command}` exited with code {}", result.exit_code())
        } else {
            result.stderr().to_string()
        };
        Self::Failed { reason }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Short label for terminal output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadySatisfied => "already satisfied",
            Self::Applied => "applied",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => f.write_str(reason),
            other => f.write_str(other.label()),
        }
    }
}
