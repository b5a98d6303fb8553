//! Shared deterministic types for the agent pipeline.
//!
//! Every value here lives for a single run: it is created from the process
//! environment or an API response and consumed before the process exits.

use serde::{Deserialize, Serialize};

/// Unit of work derived from an issue-tracker item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    /// Free-form issue body. May contain newlines and markup.
    pub body: String,
    /// Issue number as provided by the environment (kept as a string).
    pub identifier: String,
}

/// A model advertised by the models-listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
}

/// Shape of the artifact written to the working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// The completion is written byte-for-byte.
    Raw,
    /// The completion is embedded in a markdown proposal under a heading.
    #[default]
    Proposal,
}

impl ArtifactFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactFormat::Raw => "raw",
            ArtifactFormat::Proposal => "proposal",
        }
    }
}

/// Result of the optional pull-request step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestStatus {
    /// `gh pr create` succeeded; `url` is whatever it printed.
    Created { url: String },
    /// A pull request for the head branch was already open.
    AlreadyExists,
    /// Pull-request creation is disabled in config.
    Skipped,
    /// The hosting CLI failed. The branch was still pushed.
    Failed { message: String },
}
