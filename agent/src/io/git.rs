//! Git adapter for the publisher.
//!
//! Every invocation is an argument vector with a timeout; a non-zero exit is
//! returned as an error carrying the command line and captured stderr.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument};

use crate::io::process::{CommandOutput, run_command_with_timeout};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
            output_limit_bytes,
        }
    }

    /// Set the repository-local author identity.
    #[instrument(skip_all, fields(name))]
    pub fn configure_identity(&self, name: &str, email: &str) -> Result<()> {
        self.run_checked(&["config", "user.name", name])?;
        self.run_checked(&["config", "user.email", email])?;
        debug!(name, email, "configured commit identity");
        Ok(())
    }

    /// Check that `name` is a valid branch name (`git check-ref-format --branch`).
    pub fn check_branch_name(&self, name: &str) -> Result<()> {
        self.run_checked(&["check-ref-format", "--branch", name])?;
        Ok(())
    }

    /// Create and checkout a new branch at current HEAD. Fails if it exists.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "creating and checking out new branch");
        self.run_checked(&["checkout", "-b", branch])?;
        Ok(())
    }

    /// Create or reset a branch to current HEAD and check it out.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_reset_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "resetting and checking out branch");
        self.run_checked(&["checkout", "-B", branch])?;
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run_capture(&["diff", "--cached", "--name-only"])?;
        Ok(!out.trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(true)
    }

    /// Push `branch` to `remote`, optionally overwriting the remote branch.
    #[instrument(skip_all, fields(remote, branch, force))]
    pub fn push(&self, remote: &str, branch: &str, force: bool) -> Result<()> {
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.extend([remote, branch]);
        self.run_checked(&args)?;
        info!(remote, branch, force, "pushed branch");
        Ok(())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(output.stdout_lossy())
    }

    fn run_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(args)?;
        if !output.success() {
            let label = format!("git {}", args.join(" "));
            return Err(anyhow!(output.failure_summary(&label, self.timeout)));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
    }
}
