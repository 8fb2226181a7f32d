//! SSH target description, resolved from the deployment configuration.

use anyhow::{Context, Result};

use crate::domain::config::ConfigSupplier;

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;
/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Immutable description of the host a session talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    pub connect_timeout_secs: u64,
}

impl SshTarget {
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port: DEFAULT_PORT,
            identity_file: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    /// Read `remote`, `user` and the optional `port`, `ssh_identity` and
    /// `connect_timeout` keys.
    ///
    /// # Errors
    ///
    /// Returns an error if `remote` or `user` is missing, or if `port` /
    /// `connect_timeout` are not valid numbers.
    pub fn from_config(config: &impl ConfigSupplier) -> Result<Self> {
        let mut target = Self::new(config.get("remote")?, config.get("user")?);
        validate_host(&target.host)?;
        if let Some(port) = config.get_opt("port")? {
            target.port = port
                .parse()
                .with_context(|| format!("invalid port '{port}'"))?;
        }
        if let Some(timeout) = config.get_opt("connect_timeout")? {
            target.connect_timeout_secs = timeout
                .parse()
                .with_context(|| format!("invalid connect_timeout '{timeout}'"))?;
        }
        target.identity_file = config.get_opt("ssh_identity")?;
        Ok(target)
    }

    /// `user@host` destination for ssh and rsync.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Validates a hostname or address.
///
/// # Errors
///
/// Returns an error if `host` is empty, starts with `-` (would be read as an
/// ssh option) or contains whitespace.
pub fn validate_host(host: &str) -> Result<()> {
    anyhow::ensure!(!host.is_empty(), "remote host is empty");
    anyhow::ensure!(
        !host.starts_with('-'),
        "remote host must not start with '-' (got: {host:?})"
    );
    anyhow::ensure!(
        !host.chars().any(char::is_whitespace),
        "remote host must not contain whitespace (got: {host:?})"
    );
    Ok(())
}
