//! `gemini-agent`: turn an issue into a generated artifact and a pull request.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gemini_agent::core::types::PullRequestStatus;
use gemini_agent::exit_codes;
use gemini_agent::io::config::{AgentConfig, config_path, load_config, write_config};
use gemini_agent::io::generation::{GeminiClient, GeminiConfig, Generator};
use gemini_agent::io::hosting::GhCli;
use gemini_agent::io::input::{collect_api_key, collect_task, process_env};
use gemini_agent::logging;
use gemini_agent::pipeline::{RunOutcome, render_prompt, run_pipeline};

#[derive(Parser)]
#[command(
    name = "gemini-agent",
    version,
    about = "Generate a change for an issue and open a pull request"
)]
struct Cli {
    /// Config file (default: ./gemini-agent.toml; missing file means defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a completion for the task in the environment and publish it.
    Run {
        /// Model identifier, overriding `generation.model`.
        #[arg(long, env = "GEMINI_MODEL")]
        model: Option<String>,
        /// Reset the task branch and force-push over a previous attempt.
        #[arg(long)]
        force_push: bool,
        /// Push the branch but do not open a pull request.
        #[arg(long)]
        no_pr: bool,
    },
    /// Print the prompt for the task in the environment without sending it.
    Prompt,
    /// List the models the API key can use.
    Models,
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolve working directory")?;
    let path = config_path(&root, cli.config.as_deref());
    match cli.command {
        Command::Run {
            model,
            force_push,
            no_pr,
        } => {
            let mut cfg = load_config(&path)?;
            apply_run_overrides(&mut cfg, model, force_push, no_pr)?;
            cmd_run(&root, &cfg)
        }
        Command::Prompt => cmd_prompt(&load_config(&path)?),
        Command::Models => cmd_models(&load_config(&path)?),
        Command::Init { force } => cmd_init(&path, force),
    }
}

fn apply_run_overrides(
    cfg: &mut AgentConfig,
    model: Option<String>,
    force_push: bool,
    no_pr: bool,
) -> Result<()> {
    if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
        cfg.generation.model = model;
    }
    cfg.publish.force_push |= force_push;
    if no_pr {
        cfg.publish.create_pull_request = false;
    }
    cfg.validate()
}

fn gemini_client(cfg: &AgentConfig) -> Result<GeminiClient> {
    let api_key = collect_api_key(&cfg.input, process_env)?;
    GeminiClient::new(GeminiConfig {
        base_url: cfg.generation.base_url.clone(),
        model: cfg.generation.model.clone(),
        api_key,
        timeout: cfg.generation_timeout(),
    })
}

fn cmd_run(root: &Path, cfg: &AgentConfig) -> Result<i32> {
    let task = collect_task(&cfg.input, process_env)?;
    let client = gemini_client(cfg)?;
    let gh = GhCli::new(
        cfg.publish.hosting_command.clone(),
        root,
        cfg.command_timeout(),
        cfg.publish.output_limit_bytes,
    );

    let outcome = run_pipeline(root, cfg, &task, &client, &gh)?;
    match &outcome {
        RunOutcome::Published(published) => {
            println!(
                "published {} on branch {}",
                published.artifact.display(),
                published.branch
            );
            match &published.pull_request {
                PullRequestStatus::Created { url } => println!("pull request: {url}"),
                PullRequestStatus::AlreadyExists => {
                    println!("pull request: already open for {}", published.branch);
                }
                PullRequestStatus::Skipped => println!("pull request: skipped"),
                PullRequestStatus::Failed { message } => {
                    eprintln!("pull request creation failed: {message}");
                }
            }
        }
        RunOutcome::NotPublished { error, models } => {
            eprintln!("generation failed: {error}");
            if models.is_empty() {
                eprintln!("no models could be listed");
            } else {
                eprintln!("available models:");
                for model in models {
                    eprintln!("  {}", model.name);
                }
            }
        }
        RunOutcome::PublishFailed { branch, error } => {
            eprintln!("publish failed for {branch}: {error:#}");
        }
    }
    Ok(outcome.exit_code())
}

fn cmd_prompt(cfg: &AgentConfig) -> Result<i32> {
    let task = collect_task(&cfg.input, process_env)?;
    let prompt = render_prompt(cfg, &task)?;
    println!("{}", prompt.as_str());
    Ok(exit_codes::OK)
}

fn cmd_models(cfg: &AgentConfig) -> Result<i32> {
    let models = gemini_client(cfg)?
        .list_models()
        .context("list models")?;
    for model in models {
        println!("{}", model.name);
    }
    Ok(exit_codes::OK)
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(path, &AgentConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}
