//! Branch naming for task branches.

/// Return the branch name for a task: `<prefix>-<identifier>`.
///
/// Pure: the same prefix and identifier always yield the same name.
pub fn branch_name(prefix: &str, identifier: &str) -> String {
    format!("{prefix}-{identifier}")
}

/// Check that an identifier can be embedded in a branch name and file path.
///
/// Accepts ASCII alphanumerics plus `-`, `_` and `.`, with the dot
/// restrictions git applies to ref names: no leading or trailing `.`, no
/// `..`, no `.lock` suffix.
pub fn check_identifier(identifier: &str) -> Result<(), String> {
    if identifier.is_empty() {
        return Err("identifier must not be empty".to_string());
    }
    if identifier.starts_with('.') || identifier.ends_with('.') || identifier.contains("..") {
        return Err(format!(
            "identifier '{identifier}' must not start or end with '.' or contain '..'"
        ));
    }
    if identifier.ends_with(".lock") {
        return Err(format!("identifier '{identifier}' must not end with '.lock'"));
    }
    if let Some(bad) = identifier
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!(
            "identifier '{identifier}' contains unsupported character {bad:?}"
        ));
    }
    Ok(())
}
