//! Playbook catalogue: names, phases and required configuration keys.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::Serialize;

use crate::domain::config::ConfigSupplier;

/// Keys every playbook needs to open a session.
pub const SESSION_KEYS: &[&str] = &["remote", "user"];

/// The playbooks hostkit can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybookKind {
    /// Debugging conveniences: starship, tmux, mc.
    Tools,
    /// k3s + Helm + cert-manager + Mattermost.
    Mattermost,
    /// Apache + PHP-FPM + MariaDB + Nextcloud.
    Nextcloud,
}

impl PlaybookKind {
    pub const ALL: [Self; 3] = [Self::Tools, Self::Mattermost, Self::Nextcloud];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::Mattermost => "mattermost",
            Self::Nextcloud => "nextcloud",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Tools => "starship prompt, tmux, rsync and midnight commander",
            Self::Mattermost => "k3s, Helm, ingress-nginx, cert-manager and Mattermost with TLS",
            Self::Nextcloud => "Apache, PHP-FPM, MariaDB, memcached and Nextcloud",
        }
    }

    /// Phases in execution order.
    #[must_use]
    pub fn phases(self) -> &'static [&'static str] {
        match self {
            Self::Tools => &["shell", "packages", "mc-config"],
            Self::Mattermost => &[
                "system",
                "k3s",
                "helm",
                "ingress",
                "cert-manager",
                "app",
                "tls",
                "verify",
                "certificates",
            ],
            Self::Nextcloud => &["packages", "webserver", "database", "download", "configure"],
        }
    }

    /// Configuration keys this playbook reads, beyond [`SESSION_KEYS`].
    #[must_use]
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            Self::Tools => &[],
            Self::Mattermost => &[
                "mattermost::letsencrypt_email",
                "mattermost::psql_user",
                "mattermost::psql_password",
                "mattermost::site_url",
            ],
            Self::Nextcloud => &[
                "server_name",
                "memcached_memory",
                "sql_user",
                "sql_password",
                "nc_release_file_url",
                "nc_admin_user",
                "nc_admin_pw",
            ],
        }
    }
}

impl fmt::Display for PlaybookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlaybookKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|k| k.name()).collect();
                format!("unknown playbook '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Resolve a `--phase` selection against a playbook, keeping playbook order.
/// An empty selection means every phase.
///
/// # Errors
///
/// Returns an error naming the valid phases if any selected phase is unknown.
pub fn select_phases(kind: PlaybookKind, selected: &[String]) -> Result<Vec<&'static str>> {
    let all = kind.phases();
    if selected.is_empty() {
        return Ok(all.to_vec());
    }
    if let Some(unknown) = selected.iter().find(|s| !all.contains(&s.as_str())) {
        anyhow::bail!(
            "unknown phase '{unknown}' for playbook {kind}\n\nValid phases: {}",
            all.join(", ")
        );
    }
    Ok(all
        .iter()
        .copied()
        .filter(|p| selected.iter().any(|s| s == p))
        .collect())
}

/// Required keys absent from `config`.
///
/// # Errors
///
/// Returns an error if a present key is not a scalar.
pub fn missing_keys(config: &impl ConfigSupplier, kind: PlaybookKind) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    for key in SESSION_KEYS.iter().chain(kind.required_keys()) {
        if config.lookup(key)?.is_none() {
            missing.push((*key).to_string());
        }
    }
    Ok(missing)
}
