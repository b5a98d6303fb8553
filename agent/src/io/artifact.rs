//! Artifact file output.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::core::artifact::check_relative_path;

/// Write `contents` to `root/relative`, replacing any existing file.
///
/// Parent directories are created as needed. Returns the absolute path.
pub fn write_artifact(root: &Path, relative: &Path, contents: &str) -> Result<PathBuf> {
    check_relative_path(relative).map_err(|msg| anyhow!(msg))?;
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create artifact dir {}", parent.display()))?;
    }
    fs::write(&path, contents).with_context(|| format!("write artifact {}", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote artifact");
    Ok(path)
}
