//! Prompt rendering for the generation request.
//!
//! Templates are rendered with minijinja and no auto-escaping: task fields
//! land in the prompt byte-for-byte.

use anyhow::{Context, Result};
use minijinja::{Environment, UndefinedBehavior, context};
use serde::Serialize;
use tracing::debug;

use crate::core::types::{ArtifactFormat, Task};

const RAW_TEMPLATE: &str = include_str!("prompts/raw.md");
const PROPOSAL_TEMPLATE: &str = include_str!("prompts/proposal.md");

/// Variables available to the config-supplied templates
/// (artifact path, commit message, pull-request title and body).
#[derive(Debug, Clone, Serialize)]
pub struct TemplateVars {
    pub id: String,
    pub title: String,
    pub body: String,
    pub branch: String,
}

impl TemplateVars {
    pub fn new(task: &Task, branch: &str) -> Self {
        Self {
            id: task.identifier.clone(),
            title: task.title.clone(),
            body: task.body.clone(),
            branch: branch.to_string(),
        }
    }
}

/// Render a one-off template string. Unknown variables are errors.
pub fn render_inline(template: &str, vars: &TemplateVars) -> Result<String> {
    let env = strict_env();
    let rendered = env
        .render_str(template, vars)
        .with_context(|| format!("render template '{template}'"))?;
    Ok(rendered)
}

fn strict_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Result<Self> {
        let mut env = strict_env();
        env.add_template("raw", RAW_TEMPLATE)
            .context("load raw prompt template")?;
        env.add_template("proposal", PROPOSAL_TEMPLATE)
            .context("load proposal prompt template")?;
        Ok(Self { env })
    }

    fn render(&self, format: ArtifactFormat, task: &Task) -> Result<String> {
        let template = self.env.get_template(format.as_str())?;
        let rendered = template.render(context! { task => task })?;
        Ok(rendered)
    }
}

/// Builds the prompt for a task, choosing the instruction clause that
/// matches the artifact the publisher will write.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    format: ArtifactFormat,
}

impl PromptBuilder {
    pub fn new(format: ArtifactFormat) -> Self {
        Self { format }
    }

    pub fn build(&self, task: &Task) -> Result<Prompt> {
        let engine = PromptEngine::new()?;
        let content = engine
            .render(self.format, task)
            .with_context(|| format!("render {} prompt", self.format.as_str()))?;
        debug!(format = self.format.as_str(), bytes = content.len(), "built prompt");
        Ok(Prompt { content })
    }
}

/// A rendered prompt ready to send to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    content: String,
}

impl Prompt {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}
