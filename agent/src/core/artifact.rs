//! Artifact content and path rules.

use std::path::{Component, Path};

use crate::core::types::ArtifactFormat;

/// Render the bytes written to the artifact file for a completion.
///
/// `Raw` returns the completion unchanged. `Proposal` wraps it under a
/// `# Proposal for Issue <id>` heading.
pub fn render_artifact(format: ArtifactFormat, identifier: &str, completion: &str) -> String {
    match format {
        ArtifactFormat::Raw => completion.to_string(),
        ArtifactFormat::Proposal => {
            format!("# Proposal for Issue {identifier}\n\n{completion}")
        }
    }
}

/// Check that an artifact path stays inside the working tree.
///
/// Rejects empty, absolute, and parent-escaping (`..`) paths.
pub fn check_relative_path(path: &Path) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("artifact path must not be empty".to_string());
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!(
                    "artifact path {} must not contain '..'",
                    path.display()
                ));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!(
                    "artifact path {} must be relative",
                    path.display()
                ));
            }
        }
    }
    if path.file_name().is_none() {
        return Err(format!("artifact path {} has no file name", path.display()));
    }
    Ok(())
}
