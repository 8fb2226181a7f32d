//! Embedded templates, compiled into the binary from `cli/assets/templates/`.
//!
//! Names are paths relative to that directory, e.g.
//! `mattermost/cluster-issuer.yaml`.

use anyhow::Result;
use include_dir::{Dir, include_dir};

use crate::application::ports::AssetSource;

static TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets/templates");

/// Production `AssetSource`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets;

impl AssetSource for EmbeddedAssets {
    fn get_asset(&self, name: &str) -> Result<&'static [u8]> {
        get_asset(name)
    }
}

/// Return the raw bytes of a single embedded template.
///
/// # Errors
///
/// Returns an error if no template with the given `name` exists.
pub fn get_asset(name: &str) -> Result<&'static [u8]> {
    TEMPLATES
        .get_file(name)
        .map(|f| f.contents())
        .ok_or_else(|| anyhow::anyhow!("embedded template not found: {name}"))
}

/// Names of every embedded template, sorted.
#[must_use]
pub fn template_names() -> Vec<String> {
    let mut names = Vec::new();
    collect(&TEMPLATES, &mut names);
    names.sort();
    names
}

fn collect(dir: &Dir<'_>, out: &mut Vec<String>) {
    for file in dir.files() {
        out.push(file.path().to_string_lossy().replace('\\', "/"));
    }
    for sub in dir.dirs() {
        collect(sub, out);
    }
}
