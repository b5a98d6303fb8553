//! Input collection: the task and API key come from the process environment.
//!
//! Lookups go through a closure so tests can supply a fixed environment
//! instead of mutating the real one.

use anyhow::{Result, anyhow};
use tracing::{debug, warn};

use crate::core::branch::check_identifier;
use crate::core::types::Task;
use crate::io::config::InputConfig;

/// Look up a variable in the real process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Read the task fields.
///
/// Title and body default to empty (with a warning) when unset. The
/// identifier is required and must be safe to embed in a branch name.
pub fn collect_task<F>(cfg: &InputConfig, lookup: F) -> Result<Task>
where
    F: Fn(&str) -> Option<String>,
{
    let title = lookup(&cfg.title_var).unwrap_or_else(|| {
        warn!(var = %cfg.title_var, "task title not set, using empty title");
        String::new()
    });
    let body = lookup(&cfg.body_var).unwrap_or_else(|| {
        warn!(var = %cfg.body_var, "task body not set, using empty body");
        String::new()
    });
    let identifier = lookup(&cfg.identifier_var)
        .map(|raw| raw.trim().to_string())
        .ok_or_else(|| anyhow!("{} is not set", cfg.identifier_var))?;
    check_identifier(&identifier).map_err(|msg| anyhow!("{}: {msg}", cfg.identifier_var))?;

    debug!(
        identifier = %identifier,
        title_len = title.len(),
        body_len = body.len(),
        "collected task"
    );
    Ok(Task {
        title,
        body,
        identifier,
    })
}

/// Read the API key. Missing and blank values are both errors.
pub fn collect_api_key<F>(cfg: &InputConfig, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(&cfg.api_key_var) {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(anyhow!("{} is not set", cfg.api_key_var)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn collects_all_fields() {
        let lookup = env(&[
            ("ISSUE_TITLE", "Add logger"),
            ("ISSUE_BODY", "Add a logging helper\nwith levels"),
            ("ISSUE_NUMBER", "42\n"),
        ]);
        let task = collect_task(&InputConfig::default(), lookup).expect("task");
        assert_eq!(task.title, "Add logger");
        assert_eq!(task.body, "Add a logging helper\nwith levels");
        assert_eq!(task.identifier, "42");
    }

    #[test]
    fn missing_title_and_body_are_empty() {
        let lookup = env(&[("ISSUE_NUMBER", "7")]);
        let task = collect_task(&InputConfig::default(), lookup).expect("task");
        assert_eq!(task.title, "");
        assert_eq!(task.body, "");
    }

    #[test]
    fn missing_identifier_is_an_error() {
        let lookup = env(&[("ISSUE_TITLE", "t")]);
        let err = collect_task(&InputConfig::default(), lookup).unwrap_err();
        assert!(err.to_string().contains("ISSUE_NUMBER is not set"));
    }

    #[test]
    fn identifier_with_shell_metacharacters_is_rejected() {
        let lookup = env(&[("ISSUE_NUMBER", "7; rm -rf /")]);
        let err = collect_task(&InputConfig::default(), lookup).unwrap_err();
        assert!(err.to_string().contains("unsupported character"));
    }

    #[test]
    fn custom_variable_names_are_honored() {
        let cfg = InputConfig {
            api_key_var: "KEY".to_string(),
            title_var: "T".to_string(),
            body_var: "B".to_string(),
            identifier_var: "N".to_string(),
        };
        let lookup = env(&[("T", "title"), ("B", "body"), ("N", "9"), ("KEY", "secret")]);
        let task = collect_task(&cfg, &lookup).expect("task");
        assert_eq!(task.identifier, "9");
        assert_eq!(collect_api_key(&cfg, &lookup).expect("key"), "secret");
    }

    #[test]
    fn blank_api_key_is_an_error() {
        let lookup = env(&[("GEMINI_API_KEY", "   ")]);
        let err = collect_api_key(&InputConfig::default(), lookup).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
