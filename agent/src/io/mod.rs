//! I/O adapters for the agent pipeline.

pub mod artifact;
pub mod config;
pub mod generation;
pub mod git;
pub mod hosting;
pub mod input;
pub mod process;
pub mod prompt;
