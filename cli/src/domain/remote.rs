//! Remote command result and execution options.

use serde::Serialize;

/// Result of one remote command. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCommandResult {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

impl RemoteCommandResult {
    #[must_use]
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Build a result from raw process output bytes (lossy UTF-8).
    #[must_use]
    pub fn from_bytes(exit_code: i32, stdout: &[u8], stderr: &[u8]) -> Self {
        Self::new(
            exit_code,
            String::from_utf8_lossy(stdout),
            String::from_utf8_lossy(stderr),
        )
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Options for a single `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Return a non-zero exit as data instead of an error.
    pub tolerate_failure: bool,
    /// Keep output out of the terminal (still returned in the result).
    pub capture_output: bool,
}

impl RunOptions {
    /// Fail on non-zero exit, echo output.
    pub const CHECKED: Self = Self {
        tolerate_failure: false,
        capture_output: false,
    };

    /// Tolerate non-zero exit, capture output. Used for probes.
    pub const PROBE: Self = Self {
        tolerate_failure: true,
        capture_output: true,
    };

    /// Tolerate non-zero exit, echo output.
    pub const TOLERANT: Self = Self {
        tolerate_failure: true,
        capture_output: false,
    };
}

/// How an upload treats an existing remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// `>`: replace the file.
    Overwrite,
    /// `>>`: append to the file.
    Append,
}

impl WriteMode {
    /// Shell redirection operator for this mode.
    #[must_use]
    pub fn redirect(self) -> &'static str {
        match self {
            Self::Overwrite => ">",
            Self::Append => ">>",
        }
    }
}
