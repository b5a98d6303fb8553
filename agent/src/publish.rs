//! Publisher: artifact write, branch, commit, push, pull request.
//!
//! Branch creation, the artifact write, staging, commit and push are
//! required: the first failure stops the run. Pull-request creation is the
//! only optional step and is reported through [`PullRequestStatus`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::artifact::render_artifact;
use crate::core::branch::branch_name;
use crate::core::types::{PullRequestStatus, Task};
use crate::io::artifact::write_artifact;
use crate::io::config::AgentConfig;
use crate::io::git::Git;
use crate::io::hosting::{PullRequestOpener, PullRequestRequest};
use crate::io::prompt::{TemplateVars, render_inline};

/// Result of a completed publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub branch: String,
    /// Artifact path relative to the repository root.
    pub artifact: PathBuf,
    /// False when the artifact matched what the branch already had.
    pub commit_created: bool,
    pub pull_request: PullRequestStatus,
}

/// Strings derived from the task before any side effect happens.
#[derive(Debug, Clone)]
struct PublishPlan {
    branch: String,
    artifact: PathBuf,
    content: String,
    commit_message: String,
    pull_request: PullRequestRequest,
}

impl PublishPlan {
    fn new(cfg: &AgentConfig, task: &Task, completion: &str) -> Result<Self> {
        let branch = branch_name(&cfg.publish.branch_prefix, &task.identifier);
        let vars = TemplateVars::new(task, &branch);
        let artifact = PathBuf::from(
            render_inline(&cfg.artifact.path, &vars).context("render artifact path")?,
        );
        let commit_message =
            render_inline(&cfg.publish.commit_message, &vars).context("render commit message")?;
        let pull_request = PullRequestRequest {
            title: render_inline(&cfg.publish.pr_title, &vars).context("render pr title")?,
            body: render_inline(&cfg.publish.pr_body, &vars).context("render pr body")?,
            head: branch.clone(),
            base: cfg.publish.pr_base.clone(),
        };
        Ok(Self {
            branch,
            artifact,
            content: render_artifact(cfg.artifact.format, &task.identifier, completion),
            commit_message,
            pull_request,
        })
    }
}

/// Publish `completion` for `task` from the repository at `root`.
#[instrument(skip_all, fields(identifier = %task.identifier))]
pub fn publish<O: PullRequestOpener + ?Sized>(
    root: &Path,
    cfg: &AgentConfig,
    task: &Task,
    completion: &str,
    opener: &O,
) -> Result<Published> {
    let plan = PublishPlan::new(cfg, task, completion)?;
    let force = cfg.publish.force_push;
    let git = Git::new(root, cfg.command_timeout(), cfg.publish.output_limit_bytes);

    git.configure_identity(&cfg.publish.bot_name, &cfg.publish.bot_email)
        .context("configure bot identity")?;
    let checkout = if force {
        git.checkout_reset_branch(&plan.branch)
    } else {
        git.checkout_new_branch(&plan.branch)
    };
    checkout.with_context(|| format!("create branch {}", plan.branch))?;

    write_artifact(root, &plan.artifact, &plan.content)?;

    git.add_all().context("stage changes")?;
    let commit_created = git
        .commit_staged(&plan.commit_message)
        .context("commit artifact")?;
    if !commit_created {
        warn!(branch = %plan.branch, "artifact unchanged, nothing to commit");
    }
    git.push(&cfg.publish.remote, &plan.branch, force)
        .with_context(|| format!("push {} to {}", plan.branch, cfg.publish.remote))?;

    let pull_request = open_pull_request(cfg, opener, &plan.pull_request);
    info!(branch = %plan.branch, artifact = %plan.artifact.display(), ?pull_request, "published");
    Ok(Published {
        branch: plan.branch,
        artifact: plan.artifact,
        commit_created,
        pull_request,
    })
}

fn open_pull_request<O: PullRequestOpener + ?Sized>(
    cfg: &AgentConfig,
    opener: &O,
    request: &PullRequestRequest,
) -> PullRequestStatus {
    if !cfg.publish.create_pull_request {
        info!("pull request creation disabled");
        return PullRequestStatus::Skipped;
    }
    match opener.open(request) {
        Ok(status) => status,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "pull request creation failed");
            PullRequestStatus::Failed {
                message: format!("{err:#}"),
            }
        }
    }
}
