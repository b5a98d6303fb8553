//! Pull-request creation through the hosting-platform CLI (`gh`).

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{info, instrument, warn};

use crate::core::types::PullRequestStatus;
use crate::io::process::run_command_with_timeout;

/// Everything needed to open one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: Option<String>,
}

/// Abstraction over pull-request backends.
///
/// Implementations return `Err` when the request could not be completed;
/// the publisher decides how much that matters.
pub trait PullRequestOpener {
    fn open(&self, request: &PullRequestRequest) -> Result<PullRequestStatus>;
}

/// Opener that runs `gh pr create`.
///
/// `command` is the program plus leading arguments (`["gh"]` by default);
/// the `pr create` arguments are appended to it.
#[derive(Debug, Clone)]
pub struct GhCli {
    command: Vec<String>,
    workdir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl GhCli {
    pub fn new(
        command: Vec<String>,
        workdir: impl Into<PathBuf>,
        timeout: Duration,
        output_limit_bytes: usize,
    ) -> Self {
        Self {
            command,
            workdir: workdir.into(),
            timeout,
            output_limit_bytes,
        }
    }
}

impl PullRequestOpener for GhCli {
    #[instrument(skip_all, fields(head = %request.head))]
    fn open(&self, request: &PullRequestRequest) -> Result<PullRequestStatus> {
        let Some((program, leading)) = self.command.split_first() else {
            return Err(anyhow!("hosting command is empty"));
        };
        let mut cmd = Command::new(program);
        cmd.args(leading)
            .args(pr_create_args(request))
            .current_dir(&self.workdir);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)?;

        if output.success() {
            let url = output.stdout_lossy().trim().to_string();
            info!(url = %url, "pull request created");
            return Ok(PullRequestStatus::Created { url });
        }
        if !output.timed_out && is_already_exists(&output.stderr_lossy()) {
            warn!("pull request already exists for head branch");
            return Ok(PullRequestStatus::AlreadyExists);
        }
        Err(anyhow!(output.failure_summary("gh pr create", self.timeout)))
    }
}

/// Argument vector for `gh pr create`.
pub fn pr_create_args(request: &PullRequestRequest) -> Vec<String> {
    let mut args = vec![
        "pr".to_string(),
        "create".to_string(),
        "--title".to_string(),
        request.title.clone(),
        "--body".to_string(),
        request.body.clone(),
        "--head".to_string(),
        request.head.clone(),
    ];
    if let Some(base) = &request.base {
        args.push("--base".to_string());
        args.push(base.clone());
    }
    args
}

fn is_already_exists(stderr: &str) -> bool {
    stderr.to_ascii_lowercase().contains("already exists")
}
