//! Startup validation domain types and pure diagnostic functions.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::error::PrerequisiteError;

/// Minimum OpenSSH client version (`-o ConnectTimeout`, `BatchMode`, ed25519).
pub const SSH_MIN_VERSION: semver::Version = semver::Version::new(8, 0, 0);
/// Minimum rsync version.
pub const RSYNC_MIN_VERSION: semver::Version = semver::Version::new(3, 1, 0);

#[allow(clippy::expect_used)] // Patterns are compile-time constants
static OPENSSH_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"OpenSSH_(\d+)\.(\d+)").expect("valid regex"));

#[allow(clippy::expect_used)]
static RSYNC_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rsync\s+version\s+v?(\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex")
});

// ── Types ─────────────────────────────────────────────────────────────────────

/// Presence and version of one local tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCheck {
    pub name: String,
    pub found: bool,
    pub version: Option<String>,
    pub version_ok: bool,
}

/// Local prerequisites for driving a remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrerequisiteChecks {
    pub ssh: ToolCheck,
    pub rsync: ToolCheck,
    /// Required configuration keys that are absent.
    pub missing_keys: Vec<String>,
}

impl PrerequisiteChecks {
    /// Turn the checks into a pass/fail result, reporting the first problem.
    ///
    /// # Errors
    ///
    /// Returns the [`PrerequisiteError`] for the first failing check.
    pub fn ensure_ok(&self) -> Result<(), PrerequisiteError> {
        for (tool, min) in [(&self.ssh, &SSH_MIN_VERSION), (&self.rsync, &RSYNC_MIN_VERSION)] {
            if !tool.found {
                return Err(PrerequisiteError::MissingTool {
                    tool: tool.name.clone(),
                });
            }
            if !tool.version_ok {
                return Err(PrerequisiteError::ToolTooOld {
                    tool: tool.name.clone(),
                    found: tool.version.clone().unwrap_or_else(|| "unknown".into()),
                    required: min.to_string(),
                });
            }
        }
        if !self.missing_keys.is_empty() {
            return Err(PrerequisiteError::MissingKeys {
                keys: self.missing_keys.clone(),
            });
        }
        Ok(())
    }

    /// Human-readable issue list, empty when everything passed.
    #[must_use]
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for tool in [&self.ssh, &self.rsync] {
            if !tool.found {
                issues.push(format!("{} not found", tool.name));
            } else if !tool.version_ok {
                issues.push(format!(
                    "{} {} is too old",
                    tool.name,
                    tool.version.as_deref().unwrap_or("unknown")
                ));
            }
        }
        for key in &self.missing_keys {
            issues.push(format!("config key '{key}' missing"));
        }
        issues
    }
}

/// Result of probing the remote host with a trivial command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCheck {
    pub host: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything `hostkit doctor` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorReport {
    pub local: PrerequisiteChecks,
    /// `None` when the session keys are missing and no connection was tried.
    pub remote: Option<RemoteCheck>,
}

impl DoctorReport {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.local.issues().is_empty() && self.remote.as_ref().is_some_and(|r| r.reachable)
    }
}

// ── Version parsing ───────────────────────────────────────────────────────────

/// Parse `ssh -V` output, e.g. `OpenSSH_9.6p1 Ubuntu-3ubuntu13, OpenSSL 3.0.13`.
#[must_use]
pub fn parse_ssh_version(output: &str) -> Option<semver::Version> {
    let caps = OPENSSH_VERSION.captures(output)?;
    Some(semver::Version::new(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        0,
    ))
}

/// Parse the first line of `rsync --version`, e.g.
/// `rsync  version 3.2.7  protocol version 31`.
#[must_use]
pub fn parse_rsync_version(output: &str) -> Option<semver::Version> {
    let caps = RSYNC_VERSION.captures(output)?;
    Some(semver::Version::new(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?,
    ))
}

/// Build a [`ToolCheck`] from a tool's version output.
///
/// An unparseable version is accepted.
#[must_use]
pub fn tool_check(
    name: &str,
    output: Option<&str>,
    parse: fn(&str) -> Option<semver::Version>,
    min: &semver::Version,
) -> ToolCheck {
    let Some(output) = output else {
        return ToolCheck {
            name: name.to_string(),
            found: false,
            version: None,
            version_ok: false,
        };
    };
    let version = parse(output);
    ToolCheck {
        name: name.to_string(),
        found: true,
        version_ok: version.as_ref().is_none_or(|v| v >= min),
        version: version.map(|v| v.to_string()),
    }
}
