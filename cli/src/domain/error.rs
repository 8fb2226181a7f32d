//! Typed domain error enums.
//!
//! Commands carry these inside `anyhow::Error`; `output::json::error_code`
//! recovers the variant with `downcast_ref`.

use thiserror::Error;

// ── Session errors ────────────────────────────────────────────────────────────

/// Errors raised by a remote session.
///
/// `Transport` means the command never ran (or its result is unknowable).
/// `CommandFailed` is only produced for commands run without
/// `tolerate_failure`; tolerant callers receive the non-zero exit as data.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot reach {host}: {reason}")]
    Transport { host: String, reason: String },

    #[error("remote command failed with exit code {exit_code}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

impl SessionError {
    /// Returns `true` for connection-level failures.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

// ── Step errors ───────────────────────────────────────────────────────────────

/// Raised when a required provisioning step reports `Failed`.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step '{step}' failed:\n{reason}")]
    Failed { step: String, reason: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to the deployment configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration key '{key}'")]
    MissingKey { key: String },

    #[error("configuration key '{key}' must be a string, number or boolean")]
    NotAScalar { key: String },

    #[error("invalid configuration: {0}")]
    Parse(String),

    #[error("no {file} found in {start} or any parent directory. Pass --config or set HOSTKIT_CONFIG.")]
    NotFound { file: String, start: String },
}

// ── Template errors ───────────────────────────────────────────────────────────

/// Errors raised while rendering an embedded template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{template}' references unknown key '{key}'")]
    UnknownKey { template: String, key: String },

    #[error("template '{template}' has an unterminated placeholder at byte {offset}")]
    Unterminated { template: String, offset: usize },

    #[error("template '{template}' rendered to invalid YAML: {reason}")]
    InvalidYaml { template: String, reason: String },
}

// ── Edit errors ───────────────────────────────────────────────────────────────

/// Errors raised by in-place remote file edits.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("{path}: neither the original text nor its replacement was found:\n{pattern}")]
    PatternNotFound { path: String, pattern: String },
}

// ── Prerequisite errors ───────────────────────────────────────────────────────

/// Startup validation failures, reported before any remote command runs.
#[derive(Debug, Error)]
pub enum PrerequisiteError {
    #[error("'{tool}' was not found on PATH. Install it and retry.")]
    MissingTool { tool: String },

    #[error("'{tool}' {found} is too old (need {required} or later)")]
    ToolTooOld {
        tool: String,
        found: String,
        required: String,
    },

    #[error("configuration is missing required keys: {}", keys.join(", "))]
    MissingKeys { keys: Vec<String> },
}
