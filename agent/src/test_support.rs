//! Test-only helpers: a throwaway git repository with a bare remote and
//! scripted doubles for the generation and pull-request seams.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{ModelDescriptor, PullRequestStatus, Task};
use crate::io::generation::{GenerationError, Generator};
use crate::io::hosting::{PullRequestOpener, PullRequestRequest};
use crate::io::prompt::Prompt;

/// Build a task with the given fields.
pub fn task(title: &str, body: &str, identifier: &str) -> Task {
    Task {
        title: title.to_string(),
        body: body.to_string(),
        identifier: identifier.to_string(),
    }
}

/// A working repository on `main` with one commit, cloned-from-style wired
/// to a bare `origin` that already has `main`.
pub struct TestRepo {
    work: TempDir,
    remote: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let remote = tempfile::tempdir().context("create remote dir")?;
        run_git(remote.path(), &["init", "--bare", "--quiet"])?;

        let work = tempfile::tempdir().context("create work dir")?;
        let root = work.path();
        run_git(root, &["init", "--quiet"])?;
        run_git(root, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        run_git(root, &["config", "user.name", "Test User"])?;
        run_git(root, &["config", "user.email", "test@local.invalid"])?;
        run_git(root, &["config", "commit.gpgsign", "false"])?;
        fs::write(root.join("README.md"), "# test repo\n").context("write README")?;
        run_git(root, &["add", "-A"])?;
        run_git(root, &["commit", "--quiet", "-m", "chore: initial commit"])?;

        let remote_path = remote
            .path()
            .to_str()
            .ok_or_else(|| anyhow!("non-utf8 temp path"))?
            .to_string();
        run_git(root, &["remote", "add", "origin", &remote_path])?;
        run_git(root, &["push", "--quiet", "origin", "main"])?;
        Ok(Self { work, remote })
    }

    pub fn path(&self) -> &Path {
        self.work.path()
    }

    pub fn remote_path(&self) -> &Path {
        self.remote.path()
    }

    pub fn checkout(&self, branch: &str) -> Result<()> {
        run_git(self.path(), &["checkout", "--quiet", branch])?;
        Ok(())
    }

    pub fn current_branch(&self) -> Result<String> {
        Ok(run_git(self.path(), &["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    pub fn local_branch_exists(&self, branch: &str) -> bool {
        ref_exists(self.path(), branch)
    }

    pub fn remote_branch_exists(&self, branch: &str) -> bool {
        ref_exists(self.remote_path(), branch)
    }

    /// Full message of the HEAD commit, without the trailing newline.
    pub fn head_message(&self) -> Result<String> {
        Ok(run_git(self.path(), &["log", "-1", "--format=%B"])?
            .trim_end()
            .to_string())
    }

    /// Contents of `path` at the tip of `branch` on the bare remote.
    pub fn remote_file(&self, branch: &str, path: &str) -> Result<String> {
        run_git(self.remote_path(), &["show", &format!("{branch}:{path}")])
    }

    /// Number of commits reachable from `branch` on the bare remote.
    pub fn remote_commit_count(&self, branch: &str) -> Result<usize> {
        run_git(self.remote_path(), &["rev-list", "--count", branch])?
            .trim()
            .parse()
            .context("parse commit count")
    }
}

fn ref_exists(dir: &Path, branch: &str) -> bool {
    Command::new("git")
        .args(["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")])
        .current_dir(dir)
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        return Err(anyhow!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Generator that returns a fixed completion, or fails and lists fixed models.
pub struct ScriptedGenerator {
    completion: Option<String>,
    models: Vec<String>,
    generate_calls: Cell<usize>,
    list_calls: Cell<usize>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn completing(text: &str) -> Self {
        Self {
            completion: Some(text.to_string()),
            models: Vec::new(),
            generate_calls: Cell::new(0),
            list_calls: Cell::new(0),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(models: Vec<String>) -> Self {
        Self {
            completion: None,
            models,
            generate_calls: Cell::new(0),
            list_calls: Cell::new(0),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.get()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        self.generate_calls.set(self.generate_calls.get() + 1);
        self.prompts.borrow_mut().push(prompt.as_str().to_string());
        self.completion
            .clone()
            .ok_or_else(|| GenerationError::Status {
                endpoint: "scripted".to_string(),
                status: 404,
                body: "model not found".to_string(),
            })
    }

    fn list_models(&self) -> Result<Vec<ModelDescriptor>, GenerationError> {
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(self
            .models
            .iter()
            .map(|name| ModelDescriptor { name: name.clone() })
            .collect())
    }
}

/// Pull-request opener that records requests instead of calling `gh`.
pub struct RecordingPrOpener {
    failure: Option<String>,
    requests: RefCell<Vec<PullRequestRequest>>,
}

impl RecordingPrOpener {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PullRequestRequest> {
        self.requests.borrow().clone()
    }
}

impl PullRequestOpener for RecordingPrOpener {
    fn open(&self, request: &PullRequestRequest) -> Result<PullRequestStatus> {
        self.requests.borrow_mut().push(request.clone());
        match &self.failure {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(PullRequestStatus::Created {
                url: format!("https://example.invalid/pull/{}", request.head),
            }),
        }
    }
}
