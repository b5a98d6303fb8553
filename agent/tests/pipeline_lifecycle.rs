//! End-to-end pipeline tests.
//!
//! Each test drives `run_pipeline` against a mocked generation endpoint
//! (`httpmock`), a real `git` repository with a bare remote, and a recording
//! pull-request opener in place of `gh`.

use std::fs;
use std::time::Duration;

use gemini_agent::core::types::{ArtifactFormat, PullRequestStatus};
use gemini_agent::exit_codes;
use gemini_agent::io::config::AgentConfig;
use gemini_agent::io::generation::{GeminiClient, GeminiConfig};
use gemini_agent::pipeline::{RunOutcome, run_pipeline};
use gemini_agent::test_support::{RecordingPrOpener, TestRepo, task};
use httpmock::prelude::*;
use serde_json::json;

const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-pro:generateContent";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::new(GeminiConfig {
        base_url: server.base_url(),
        model: "gemini-1.5-pro".to_string(),
        api_key: "test-key".to_string(),
        timeout: Duration::from_secs(10),
    })
    .expect("client")
}

fn raw_config() -> AgentConfig {
    let mut cfg = AgentConfig::default();
    cfg.artifact.path = "geminitest.txt".to_string();
    cfg.artifact.format = ArtifactFormat::Raw;
    cfg
}

fn completion(text: &str) -> serde_json::Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

/// Issue "Add logger" (#42): the prompt carries the task, the completion
/// lands byte-for-byte in the artifact, and the branch is `gemini-task-42`.
#[test]
fn completion_is_published_on_task_branch() {
    let server = MockServer::start();
    let generate = server.mock(|when, then| {
        when.method(POST)
            .path(GENERATE_PATH)
            .query_param("key", "test-key")
            .body_contains("Add logger")
            .body_contains("Add a logging helper");
        then.status(200).json_body(completion("def log(): pass"));
    });
    let listing = server.mock(|when, then| {
        when.method(GET).path("/v1beta/models");
        then.status(200).json_body(json!({ "models": [] }));
    });

    let repo = TestRepo::new().expect("repo");
    let opener = RecordingPrOpener::succeeding();
    let outcome = run_pipeline(
        repo.path(),
        &raw_config(),
        &task("Add logger", "Add a logging helper", "42"),
        &client(&server),
        &opener,
    )
    .expect("run");

    generate.assert_hits(1);
    listing.assert_hits(0);
    assert_eq!(outcome.exit_code(), exit_codes::OK);
    let published = match outcome {
        RunOutcome::Published(published) => published,
        other => panic!("unexpected outcome {other:?}"),
    };
    assert_eq!(published.branch, "gemini-task-42");
    assert!(matches!(
        published.pull_request,
        PullRequestStatus::Created { .. }
    ));
    assert_eq!(
        fs::read_to_string(repo.path().join("geminitest.txt")).expect("artifact"),
        "def log(): pass"
    );
    assert_eq!(repo.current_branch().expect("branch"), "gemini-task-42");
    assert_eq!(
        repo.remote_file("gemini-task-42", "geminitest.txt")
            .expect("remote artifact"),
        "def log(): pass"
    );
    assert_eq!(opener.requests()[0].head, "gemini-task-42");
}

/// A 404 from the generation endpoint triggers one model listing and
/// leaves the repository untouched.
#[test]
fn not_found_model_lists_models_and_publishes_nothing() {
    let server = MockServer::start();
    let generate = server.mock(|when, then| {
        when.method(POST).path(GENERATE_PATH);
        then.status(404).json_body(json!({
            "error": { "code": 404, "message": "models/gemini-1.5-pro is not found" }
        }));
    });
    let listing = server.mock(|when, then| {
        when.method(GET)
            .path("/v1beta/models")
            .query_param("key", "test-key");
        then.status(200).json_body(json!({
            "models": [{ "name": "models/gemini-2.0-flash" }, { "name": "models/gemini-2.5-pro" }]
        }));
    });

    let repo = TestRepo::new().expect("repo");
    let opener = RecordingPrOpener::succeeding();
    let outcome = run_pipeline(
        repo.path(),
        &raw_config(),
        &task("Add logger", "Add a logging helper", "42"),
        &client(&server),
        &opener,
    )
    .expect("run");

    generate.assert_hits(1);
    listing.assert_hits(1);
    assert_eq!(outcome.exit_code(), exit_codes::NOT_PUBLISHED);
    match outcome {
        RunOutcome::NotPublished { error, models } => {
            assert!(error.to_string().contains("404"));
            assert!(!error.to_string().contains("test-key"));
            let names: Vec<String> = models.into_iter().map(|m| m.name).collect();
            assert_eq!(names, vec!["models/gemini-2.0-flash", "models/gemini-2.5-pro"]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!repo.path().join("geminitest.txt").exists());
    assert!(!repo.local_branch_exists("gemini-task-42"));
    assert!(!repo.remote_branch_exists("gemini-task-42"));
    assert_eq!(repo.current_branch().expect("branch"), "main");
    assert!(opener.requests().is_empty());
}

/// A 200 response without `candidates` is a failure, not a crash.
#[test]
fn blocked_response_is_treated_as_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(GENERATE_PATH);
        then.status(200)
            .json_body(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
    });
    let listing = server.mock(|when, then| {
        when.method(GET).path("/v1beta/models");
        then.status(200).json_body(json!({ "models": [] }));
    });

    let repo = TestRepo::new().expect("repo");
    let outcome = run_pipeline(
        repo.path(),
        &raw_config(),
        &task("t", "b", "5"),
        &client(&server),
        &RecordingPrOpener::succeeding(),
    )
    .expect("run");

    listing.assert_hits(1);
    assert!(matches!(outcome, RunOutcome::NotPublished { .. }));
    assert!(!repo.local_branch_exists("gemini-task-5"));
}

/// Two runs for issue #7 with force-push: the second replaces the first
/// attempt on the remote branch instead of failing.
#[test]
fn force_push_rerun_overwrites_task_branch() {
    let repo = TestRepo::new().expect("repo");
    let mut cfg = raw_config();
    cfg.publish.force_push = true;
    let t = task("Retry me", "second attempt should win", "7");

    for (attempt, text) in ["first attempt", "second attempt"].iter().enumerate() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(GENERATE_PATH);
            then.status(200).json_body(completion(text));
        });
        // Each CI run starts from a fresh checkout of the default branch.
        repo.checkout("main").expect("main");

        let outcome = run_pipeline(
            repo.path(),
            &cfg,
            &t,
            &client(&server),
            &RecordingPrOpener::succeeding(),
        )
        .expect("run");
        assert_eq!(outcome.exit_code(), exit_codes::OK, "attempt {attempt}");
    }

    assert_eq!(
        repo.remote_file("gemini-task-7", "geminitest.txt")
            .expect("remote artifact"),
        "second attempt"
    );
    // initial commit + the single surviving attempt
    assert_eq!(repo.remote_commit_count("gemini-task-7").expect("count"), 2);
}

/// Without force-push the same re-run halts at branch creation.
#[test]
fn rerun_without_force_fails_fast() {
    let repo = TestRepo::new().expect("repo");
    let cfg = raw_config();
    let t = task("Once", "only", "8");

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(GENERATE_PATH);
        then.status(200).json_body(completion("content"));
    });

    let first = run_pipeline(
        repo.path(),
        &cfg,
        &t,
        &client(&server),
        &RecordingPrOpener::succeeding(),
    )
    .expect("first run");
    assert_eq!(first.exit_code(), exit_codes::OK);

    repo.checkout("main").expect("main");
    let opener = RecordingPrOpener::succeeding();
    let second =
        run_pipeline(repo.path(), &cfg, &t, &client(&server), &opener).expect("second run");

    assert_eq!(second.exit_code(), exit_codes::PUBLISH_FAILED);
    match second {
        RunOutcome::PublishFailed { branch, error } => {
            assert_eq!(branch, "gemini-task-8");
            assert!(format!("{error:#}").contains("create branch gemini-task-8"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(opener.requests().is_empty());
}

/// Identical content on a force-pushed re-run commits nothing and still succeeds.
#[test]
fn unchanged_rerun_succeeds_without_new_commit() {
    let repo = TestRepo::new().expect("repo");
    let mut cfg = raw_config();
    cfg.publish.force_push = true;
    let t = task("Same", "same", "9");

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(GENERATE_PATH);
        then.status(200).json_body(completion("stable"));
    });

    for _ in 0..2 {
        let outcome = run_pipeline(
            repo.path(),
            &cfg,
            &t,
            &client(&server),
            &RecordingPrOpener::succeeding(),
        )
        .expect("run");
        assert_eq!(outcome.exit_code(), exit_codes::OK);
    }
    assert_eq!(repo.remote_commit_count("gemini-task-9").expect("count"), 2);
}
