//! Agent configuration stored in `gemini-agent.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::artifact::check_relative_path;
use crate::core::types::{ArtifactFormat, Task};
use crate::io::prompt::{TemplateVars, render_inline};

/// Default config file name, resolved against the working directory.
pub const CONFIG_FILE: &str = "gemini-agent.toml";

/// Agent configuration (TOML).
///
/// Every field has a default, so an absent file or a partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AgentConfig {
    pub generation: GenerationConfig,
    pub input: InputConfig,
    pub artifact: ArtifactConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Scheme and host of the generative-language API (no trailing path).
    pub base_url: String,
    /// Model identifier, e.g. `gemini-1.5-pro`. A `models/` prefix is accepted.
    pub model: String,
    /// Wall-clock limit for each HTTP request.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-pro".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Names of the environment variables the task is read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    pub api_key_var: String,
    pub title_var: String,
    pub body_var: String,
    pub identifier_var: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            api_key_var: "GEMINI_API_KEY".to_string(),
            title_var: "ISSUE_TITLE".to_string(),
            body_var: "ISSUE_BODY".to_string(),
            identifier_var: "ISSUE_NUMBER".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Path template relative to the repository root (minijinja syntax).
    pub path: String,
    pub format: ArtifactFormat,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: "gemini_proposal_issue_{{ id }}.md".to_string(),
            format: ArtifactFormat::Proposal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PublishConfig {
    pub branch_prefix: String,
    pub bot_name: String,
    pub bot_email: String,
    pub remote: String,
    /// Reset the task branch and force-push, replacing a previous attempt.
    pub force_push: bool,
    pub create_pull_request: bool,
    /// Base branch for the pull request. `None` lets `gh` pick the default.
    pub pr_base: Option<String>,
    pub commit_message: String,
    pub pr_title: String,
    pub pr_body: String,
    /// Program and leading arguments for the hosting CLI; `pr create ...`
    /// is appended.
    pub hosting_command: Vec<String>,
    /// Limit for each `git`/`gh` invocation.
    pub command_timeout_secs: u64,
    /// Captured stdout/stderr per command is truncated beyond this.
    pub output_limit_bytes: usize,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            branch_prefix: "gemini-task".to_string(),
            bot_name: "github-actions[bot]".to_string(),
            bot_email: "github-actions[bot]@users.noreply.github.com".to_string(),
            remote: "origin".to_string(),
            force_push: false,
            create_pull_request: true,
            pr_base: None,
            commit_message: "Gemini proposal for #{{ id }}: {{ title }}".to_string(),
            pr_title: "Gemini: {{ title }}".to_string(),
            pr_body: "AI generated changes for #{{ id }}".to_string(),
            hosting_command: vec!["gh".to_string()],
            command_timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.generation.base_url.trim().is_empty() {
            return Err(anyhow!("generation.base_url must not be empty"));
        }
        if self.generation.model.trim().is_empty() {
            return Err(anyhow!("generation.model must not be empty"));
        }
        if self.generation.timeout_secs == 0 {
            return Err(anyhow!("generation.timeout_secs must be > 0"));
        }
        for (key, value) in [
            ("input.api_key_var", &self.input.api_key_var),
            ("input.title_var", &self.input.title_var),
            ("input.body_var", &self.input.body_var),
            ("input.identifier_var", &self.input.identifier_var),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{key} must not be empty"));
            }
        }
        if self.publish.branch_prefix.trim().is_empty() {
            return Err(anyhow!("publish.branch_prefix must not be empty"));
        }
        if self.publish.remote.trim().is_empty() {
            return Err(anyhow!("publish.remote must not be empty"));
        }
        match self.publish.hosting_command.first() {
            Some(program) if !program.trim().is_empty() => {}
            _ => return Err(anyhow!("publish.hosting_command must name a program")),
        }
        if self.publish.command_timeout_secs == 0 {
            return Err(anyhow!("publish.command_timeout_secs must be > 0"));
        }
        if self.publish.output_limit_bytes == 0 {
            return Err(anyhow!("publish.output_limit_bytes must be > 0"));
        }

        // Render every template against a sample task so typos surface at load time.
        let sample = Task {
            title: "title".to_string(),
            body: "body".to_string(),
            identifier: "1".to_string(),
        };
        let vars = TemplateVars::new(&sample, "branch");
        let artifact = render_inline(&self.artifact.path, &vars)
            .context("artifact.path is not a valid template")?;
        check_relative_path(Path::new(&artifact)).map_err(|msg| anyhow!("artifact.path: {msg}"))?;
        for (key, template) in [
            ("publish.commit_message", &self.publish.commit_message),
            ("publish.pr_title", &self.publish.pr_title),
            ("publish.pr_body", &self.publish.pr_body),
        ] {
            let rendered = render_inline(template, &vars)
                .with_context(|| format!("{key} is not a valid template"))?;
            if rendered.trim().is_empty() {
                return Err(anyhow!("{key} must render to a non-empty string"));
            }
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.publish.command_timeout_secs)
    }
}

/// Resolve the config path: explicit flag, else `<root>/gemini-agent.toml`.
pub fn config_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => root.join(CONFIG_FILE),
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
