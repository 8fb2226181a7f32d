//! Placeholder substitution for embedded file templates.
//!
//! Placeholders are written `{{ key::path }}` and resolved through a
//! [`ConfigSupplier`]. Nothing else in the template is interpreted.

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::domain::config::ConfigSupplier;
use crate::domain::error::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Render `template`, replacing every placeholder.
///
/// # Errors
///
/// Returns [`TemplateError::UnknownKey`] for a key the supplier does not
/// know and [`TemplateError::Unterminated`] for a `{{` without `}}`.
pub fn render(name: &str, template: &str, vars: &impl ConfigSupplier) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            return Err(TemplateError::Unterminated {
                template: name.to_string(),
                offset: consumed + start,
            }
            .into());
        };
        let key = after_open[..end].trim();
        let value = vars.lookup(key)?.ok_or_else(|| TemplateError::UnknownKey {
            template: name.to_string(),
            key: key.to_string(),
        })?;
        out.push_str(&value);
        let advance = start + OPEN.len() + end + CLOSE.len();
        consumed += advance;
        rest = &rest[advance..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Check that a rendered manifest parses as (multi-document) YAML.
///
/// # Errors
///
/// Returns [`TemplateError::InvalidYaml`] with the parser message.
pub fn validate_yaml(name: &str, rendered: &str) -> Result<()> {
    use serde::Deserialize as _;
    for document in serde_yaml::Deserializer::from_str(rendered) {
        serde_yaml::Value::deserialize(document).map_err(|e| TemplateError::InvalidYaml {
            template: name.to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Lowercase hex SHA-256 of `content`, comparable with `sha256sum` output.
#[must_use]
pub fn sha256_hex(content: &[u8]) -> String {
    use std::fmt::Write as _;
    Sha256::digest(content)
        .iter()
        .fold(String::with_capacity(64), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}
