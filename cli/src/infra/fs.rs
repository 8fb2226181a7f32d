//! Filesystem infrastructure: implements `LocalArtifactWriter`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::LocalArtifactWriter;

/// Production filesystem implementation of `LocalArtifactWriter`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalArtifactWriter for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))
    }

    fn write_file(&self, path: &Path, content: &[u8], executable: bool) -> Result<()> {
        std::fs::write(path, content).with_context(|| format!("writing file {}", path.display()))?;
        #[cfg(unix)]
        if executable {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
                .with_context(|| format!("setting permissions on {}", path.display()))?;
        }
        #[cfg(not(unix))]
        let _ = executable;
        Ok(())
    }
}
