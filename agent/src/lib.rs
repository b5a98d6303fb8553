//! Issue-to-pull-request generation agent.
//!
//! Reads a task (issue title, body, number) from the environment, asks a
//! generative-language API for a completion, writes it to a file and opens
//! a pull request. The layout mirrors the pipeline:
//!
//! - **[`core`]**: Pure, deterministic logic (branch naming, artifact rules, types).
//! - **[`io`]**: Side-effecting adapters (config, environment, HTTP, `git`, `gh`).
//!
//! [`pipeline`] and [`publish`] coordinate the two to implement `gemini-agent run`.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod publish;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
