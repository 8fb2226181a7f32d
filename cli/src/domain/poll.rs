//! Bounded polling specification and result.

use std::time::Duration;

use serde::Serialize;

use crate::domain::remote::RemoteCommandResult;

/// What to poll, what to wait for, and how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSpec {
    pub status_command: String,
    pub target: String,
    pub delay: Duration,
    pub max_attempts: u32,
}

impl PollSpec {
    #[must_use]
    pub fn new(
        status_command: impl Into<String>,
        target: impl Into<String>,
        delay: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            status_command: status_command.into(),
            target: target.into(),
            delay,
            max_attempts,
        }
    }

    /// Status value extracted from a probe: its trimmed stdout.
    #[must_use]
    pub fn extract_status(result: &RemoteCommandResult) -> &str {
        result.stdout().trim()
    }

    /// A probe result matches when it exited 0 and its status equals the target.
    #[must_use]
    pub fn matches(&self, result: &RemoteCommandResult) -> bool {
        result.succeeded() && Self::extract_status(result) == self.target
    }

    /// Upper bound of the wait: `(max_attempts - 1) * delay`.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }
}

/// Outcome of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollResult {
    Ready { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl PollResult {
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    #[must_use]
    pub fn attempts(self) -> u32 {
        match self {
            Self::Ready { attempts } | Self::TimedOut { attempts } => attempts,
        }
    }
}
