//! Deployment configuration: a TOML document addressed by `::` key paths.
//!
//! Pure functions only. Loading lives in `infra::config`.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::domain::error::ConfigError;

/// Separator between path segments, e.g. `mattermost::site_url`.
pub const KEY_SEPARATOR: &str = "::";

/// Key-path lookup of configuration strings.
///
/// Values are opaque: they are substituted into commands and templates
/// and never interpreted beyond that.
pub trait ConfigSupplier {
    /// Look up `key`, returning `None` when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the key exists but is not a scalar.
    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError>;

    /// Look up a required key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] when the key is absent.
    fn get(&self, key: &str) -> Result<String> {
        self.lookup(key)?.ok_or_else(|| {
            ConfigError::MissingKey {
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Look up an optional key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key exists but is not a scalar.
    fn get_opt(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lookup(key)?)
    }

    /// Look up a key, falling back to `default`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key exists but is not a scalar.
    fn get_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.lookup(key)?.unwrap_or_else(|| default.to_string()))
    }
}

// ── Config document ──────────────────────────────────────────────────────────

/// Parsed `config.toml`.
#[derive(Debug, Clone, Default)]
pub struct DeployConfig {
    root: toml::Table,
}

impl DeployConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not valid TOML.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let root: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.message().to_string()))?;
        Ok(Self { root })
    }

    /// All scalar keys in path form, sorted, for `hostkit config show`.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        flatten_into(&self.root, "", &mut out);
        out.sort();
        out
    }
}

fn flatten_into(table: &toml::Table, prefix: &str, out: &mut Vec<(String, String)>) {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}{KEY_SEPARATOR}{name}")
        };
        match value {
            toml::Value::Table(inner) => flatten_into(inner, &key, out),
            other => {
                if let Some(s) = scalar_to_string(other) {
                    out.push((key, s));
                }
            }
        }
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

impl ConfigSupplier for DeployConfig {
    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let mut segments = key.split(KEY_SEPARATOR);
        let Some(first) = segments.next() else {
            return Ok(None);
        };
        let mut current = match self.root.get(first) {
            Some(v) => v,
            None => return Ok(None),
        };
        for segment in segments {
            match current.as_table().and_then(|t| t.get(segment)) {
                Some(v) => current = v,
                None => return Ok(None),
            }
        }
        scalar_to_string(current).map(Some).ok_or_else(|| ConfigError::NotAScalar {
            key: key.to_string(),
        })
    }
}

// ── Layered lookups ──────────────────────────────────────────────────────────

/// Derived values layered over a base supplier.
///
/// Playbooks use this to expose computed template variables (such as a
/// hostname stripped from a URL) alongside the configuration file.
pub struct Overlay<'a, C: ConfigSupplier> {
    base: &'a C,
    extra: BTreeMap<String, String>,
}

impl<'a, C: ConfigSupplier> Overlay<'a, C> {
    #[must_use]
    pub fn new(base: &'a C) -> Self {
        Self {
            base,
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

impl<C: ConfigSupplier> ConfigSupplier for Overlay<'_, C> {
    fn lookup(&self, key: &str) -> Result<Option<String>, ConfigError> {
        if let Some(v) = self.extra.get(key) {
            return Ok(Some(v.clone()));
        }
        self.base.lookup(key)
    }
}

/// Strip the scheme from a URL: `https://chat.example.org` → `chat.example.org`.
#[must_use]
pub fn host_from_url(url: &str) -> &str {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    without_scheme.trim_end_matches('/')
}

// ── Unit tests ───────────────────────────────────────────────────────────────
