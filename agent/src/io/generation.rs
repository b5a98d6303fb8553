//! Generation client: one capability, swappable transport.
//!
//! The [`Generator`] trait decouples the pipeline from the HTTP API. Tests use
//! scripted generators; [`GeminiClient`] talks to the `v1beta` REST endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::types::ModelDescriptor;
use crate::io::prompt::Prompt;

/// Error bodies are cut to this many characters before they reach logs.
const ERROR_BODY_LIMIT: usize = 512;

/// Why a generation or listing call produced no usable value.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    /// The server answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// A 2xx response whose JSON lacks the expected fields.
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },
}

/// Abstraction over text-generation backends.
pub trait Generator {
    /// Send the prompt and return the first candidate's text, unmodified.
    fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError>;

    /// List the models the credentials can reach.
    fn list_models(&self) -> Result<Vec<ModelDescriptor>, GenerationError>;
}

/// Outcome of one generation attempt.
#[derive(Debug)]
pub enum GenerationResult {
    Success {
        completion: String,
    },
    /// `models` holds the diagnostic listing; empty if that call failed too.
    Failure {
        error: GenerationError,
        models: Vec<ModelDescriptor>,
    },
}

/// Generate once; on failure issue exactly one model listing for diagnostics.
///
/// Never retries the generation itself.
#[instrument(skip_all)]
pub fn generate_with_diagnostics<G: Generator + ?Sized>(
    generator: &G,
    prompt: &Prompt,
) -> GenerationResult {
    match generator.generate(prompt) {
        Ok(completion) => {
            info!(bytes = completion.len(), "generation succeeded");
            GenerationResult::Success { completion }
        }
        Err(error) => {
            warn!(err = %error, "generation failed, listing available models");
            let models = match generator.list_models() {
                Ok(models) => {
                    for model in &models {
                        info!(name = %model.name, "available model");
                    }
                    models
                }
                Err(list_err) => {
                    warn!(err = %list_err, "model listing failed");
                    Vec::new()
                }
            };
            GenerationResult::Failure { error, models }
        }
    }
}

/// Connection settings for [`GeminiClient`].
#[derive(Clone)]
pub struct GeminiConfig {
    /// Scheme and host, e.g. `https://generativelanguage.googleapis.com`.
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    models: Option<Vec<ModelDescriptor>>,
}

/// Blocking HTTP client for the `generateContent` REST API.
///
/// The API key travels as the `key` query parameter and is never included
/// in errors or logs.
#[derive(Debug)]
pub struct GeminiClient {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { config, http })
    }

    /// Model id without the `models/` prefix the listing endpoint reports.
    fn model_id(&self) -> &str {
        let model = self.config.model.trim();
        model.strip_prefix("models/").unwrap_or(model)
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn generate_endpoint(&self) -> String {
        format!("v1beta/models/{}:generateContent", self.model_id())
    }

    fn send(
        &self,
        endpoint: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<String, GenerationError> {
        let response = request
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .map_err(|err| GenerationError::Transport {
                endpoint: endpoint.to_string(),
                message: err.without_url().to_string(),
            })?;
        read_success_body(endpoint, response)
    }
}

impl Generator for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model_id()))]
    fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let endpoint = self.generate_endpoint();
        let url = format!("{}/{}", self.base(), endpoint);
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.as_str(),
                }],
            }],
        };
        debug!(
            endpoint = %endpoint,
            prompt_bytes = prompt.as_str().len(),
            "sending generation request"
        );
        let raw = self.send(&endpoint, self.http.post(url).json(&body))?;
        extract_completion(&endpoint, &raw)
    }

    #[instrument(skip_all)]
    fn list_models(&self) -> Result<Vec<ModelDescriptor>, GenerationError> {
        let endpoint = "v1beta/models".to_string();
        let url = format!("{}/{}", self.base(), endpoint);
        debug!(endpoint = %endpoint, "listing models");
        let raw = self.send(&endpoint, self.http.get(url))?;
        let parsed: ListModelsResponse =
            serde_json::from_str(&raw).map_err(|err| GenerationError::MalformedResponse {
                endpoint: endpoint.clone(),
                reason: format!("invalid JSON: {err}"),
            })?;
        parsed.models.ok_or(GenerationError::MalformedResponse {
            endpoint,
            reason: "missing `models`".to_string(),
        })
    }
}

fn read_success_body(endpoint: &str, response: Response) -> Result<String, GenerationError> {
    let status = response.status();
    let body = response.text().map_err(|err| GenerationError::Transport {
        endpoint: endpoint.to_string(),
        message: format!("read body: {}", err.without_url()),
    })?;
    if !status.is_success() {
        return Err(GenerationError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: truncate_chars(body.trim(), ERROR_BODY_LIMIT),
        });
    }
    Ok(body)
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
fn extract_completion(endpoint: &str, raw: &str) -> Result<String, GenerationError> {
    let malformed = |reason: &str| GenerationError::MalformedResponse {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };
    let parsed: GenerateResponse =
        serde_json::from_str(raw).map_err(|err| malformed(&format!("invalid JSON: {err}")))?;
    parsed
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or_else(|| malformed("missing `candidates[0]`"))?
        .content
        .ok_or_else(|| malformed("missing `candidates[0].content`"))?
        .parts
        .and_then(|parts| parts.into_iter().next())
        .ok_or_else(|| malformed("missing `candidates[0].content.parts[0]`"))?
        .text
        .ok_or_else(|| malformed("missing `candidates[0].content.parts[0].text`"))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::test_support::ScriptedGenerator;

    const MODEL_PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            base_url: base_url.to_string(),
            model: "gemini-test".to_string(),
            api_key: "secret-key".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client")
    }

    fn completion_body(text: &str) -> serde_json::Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn generate_posts_prompt_and_returns_text_verbatim() {
        let server = MockServer::start();
        let text = "  def log(): pass\n\n";
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(MODEL_PATH)
                .query_param("key", "secret-key")
                .header("content-type", "application/json")
                .json_body(json!({ "contents": [{ "parts": [{ "text": "hello" }] }] }));
            then.status(200).json_body(completion_body(text));
        });

        let completion = client(&server.base_url())
            .generate(&Prompt::new("hello"))
            .expect("generate");

        mock.assert();
        assert_eq!(completion, text);
    }

    #[test]
    fn models_prefix_is_stripped_from_model_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200).json_body(completion_body("ok"));
        });
        let client = GeminiClient::new(GeminiConfig {
            base_url: format!("{}/", server.base_url()),
            model: "models/gemini-test".to_string(),
            api_key: "k".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client");

        assert_eq!(client.generate(&Prompt::new("p")).expect("generate"), "ok");
        mock.assert();
    }

    #[test]
    fn non_success_status_is_a_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(404).body("{\"error\":{\"message\":\"model not found\"}}");
        });

        let err = client(&server.base_url())
            .generate(&Prompt::new("p"))
            .unwrap_err();
        match &err {
            GenerationError::Status { status, body, .. } => {
                assert_eq!(*status, 404);
                assert!(body.contains("model not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.to_string().contains("secret-key"));
    }

    #[test]
    fn missing_candidates_is_malformed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200).json_body(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        });

        let err = client(&server.base_url())
            .generate(&Prompt::new("p"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse { .. }));
        assert!(err.to_string().contains("candidates[0]"));
    }

    #[test]
    fn empty_parts_is_malformed() {
        let err = extract_completion(
            "e",
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("parts[0]"));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = extract_completion("e", "<html>oops</html>").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn unreachable_host_is_a_transport_error_without_key() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let err = client("http://127.0.0.1:9")
            .generate(&Prompt::new("p"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::Transport { .. }));
        assert!(!err.to_string().contains("secret-key"));
    }

    #[test]
    fn list_models_returns_names() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1beta/models")
                .query_param("key", "secret-key");
            then.status(200).json_body(json!({
                "models": [
                    { "name": "models/gemini-1.5-pro", "displayName": "Gemini 1.5 Pro" },
                    { "name": "models/gemini-2.0-flash" }
                ]
            }));
        });

        let models = client(&server.base_url()).list_models().expect("models");
        mock.assert();
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["models/gemini-1.5-pro", "models/gemini-2.0-flash"]);
    }

    #[test]
    fn failed_generation_lists_models_exactly_once() {
        let generator = ScriptedGenerator::failing(vec!["models/a".to_string()]);
        let result = generate_with_diagnostics(&generator, &Prompt::new("p"));
        match result {
            GenerationResult::Failure { models, .. } => {
                assert_eq!(models.len(), 1);
                assert_eq!(models[0].name, "models/a");
            }
            GenerationResult::Success { .. } => panic!("expected failure"),
        }
        assert_eq!(generator.generate_calls(), 1);
        assert_eq!(generator.list_calls(), 1);
    }

    #[test]
    fn successful_generation_skips_listing() {
        let generator = ScriptedGenerator::completing("done");
        let result = generate_with_diagnostics(&generator, &Prompt::new("p"));
        assert!(matches!(
            result,
            GenerationResult::Success { ref completion } if completion == "done"
        ));
        assert_eq!(generator.list_calls(), 0);
    }

    #[test]
    fn listing_failure_still_yields_failure_result() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(500).body("boom");
        });
        let listing = server.mock(|when, then| {
            when.method(GET).path("/v1beta/models");
            then.status(403).body("denied");
        });

        let result = generate_with_diagnostics(&client(&server.base_url()), &Prompt::new("p"));
        listing.assert_hits(1);
        assert!(matches!(
            result,
            GenerationResult::Failure { ref models, .. } if models.is_empty()
        ));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let rendered = format!("{:?}", client("http://localhost"));
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
