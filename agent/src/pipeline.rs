//! Orchestration for a single `gemini-agent run`.
//!
//! `BuildPrompt -> Generate -> {Publish | DiagnoseModels}`, one pass, no
//! retries.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::branch::branch_name;
use crate::core::types::{ModelDescriptor, PullRequestStatus, Task};
use crate::exit_codes;
use crate::io::config::AgentConfig;
use crate::io::generation::{
    GenerationError, GenerationResult, Generator, generate_with_diagnostics,
};
use crate::io::git::Git;
use crate::io::hosting::PullRequestOpener;
use crate::io::prompt::{Prompt, PromptBuilder};
use crate::publish::{Published, publish};

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The branch was pushed. The pull-request step may still have failed.
    Published(Published),
    /// Generation failed; nothing was written or pushed.
    NotPublished {
        error: GenerationError,
        models: Vec<ModelDescriptor>,
    },
    /// A required version-control step failed.
    PublishFailed {
        branch: String,
        error: anyhow::Error,
    },
}

impl RunOutcome {
    /// Stable process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Published(published) => match published.pull_request {
                PullRequestStatus::Failed { .. } => exit_codes::PR_FAILED,
                _ => exit_codes::OK,
            },
            RunOutcome::NotPublished { .. } => exit_codes::NOT_PUBLISHED,
            RunOutcome::PublishFailed { .. } => exit_codes::PUBLISH_FAILED,
        }
    }
}

/// Render the prompt the run would send for `task`.
pub fn render_prompt(cfg: &AgentConfig, task: &Task) -> Result<Prompt> {
    PromptBuilder::new(cfg.artifact.format).build(task)
}

/// Run the whole pipeline for one task in the repository at `root`.
///
/// Errors are reserved for problems before generation (prompt rendering, a
/// branch name git would refuse).
/// Generation and publish failures are folded into [`RunOutcome`].
#[instrument(skip_all, fields(identifier = %task.identifier))]
pub fn run_pipeline<G, O>(
    root: &Path,
    cfg: &AgentConfig,
    task: &Task,
    generator: &G,
    opener: &O,
) -> Result<RunOutcome>
where
    G: Generator + ?Sized,
    O: PullRequestOpener + ?Sized,
{
    let branch = branch_name(&cfg.publish.branch_prefix, &task.identifier);
    Git::new(root, cfg.command_timeout(), cfg.publish.output_limit_bytes)
        .check_branch_name(&branch)
        .with_context(|| format!("invalid task branch name {branch}"))?;
    let prompt = render_prompt(cfg, task)?;
    info!(prompt_bytes = prompt.as_str().len(), "prompt ready");

    let completion = match generate_with_diagnostics(generator, &prompt) {
        GenerationResult::Success { completion } => completion,
        GenerationResult::Failure { error, models } => {
            warn!(models = models.len(), "run ends without publishing");
            return Ok(RunOutcome::NotPublished { error, models });
        }
    };

    match publish(root, cfg, task, &completion, opener) {
        Ok(published) => Ok(RunOutcome::Published(published)),
        Err(error) => {
            warn!(branch = %branch, err = %format!("{error:#}"), "publish failed");
            Ok(RunOutcome::PublishFailed { branch, error })
        }
    }
}
