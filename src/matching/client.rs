//! Text-completion client used to rank tutors.
//!
//! The upstream service is untrusted and best-effort: transport failures,
//! timeouts, non-2xx statuses and malformed bodies all degrade to an empty
//! reply, which resolves to zero matches.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::{fmt_duration, log_if_slow};

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

#[async_trait]
pub trait CompletionService: Send + Sync + 'static {
    /// Send `prompt` and return the raw reply text, or `""` on any failure.
    async fn complete(&self, prompt: &str) -> String;
}

/// Used when no API key is configured. Every run resolves to zero matches.
pub struct DisabledCompletion;

#[async_trait]
impl CompletionService for DisabledCompletion {
    async fn complete(&self, _prompt: &str) -> String {
        debug!("completion service disabled, returning empty reply");
        String::new()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyPart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate.
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Extract the reply text from a raw response body.
fn parse_reply(body: &[u8]) -> anyhow::Result<String> {
    let deserializer = &mut serde_json::Deserializer::from_slice(body);
    let response: GenerateResponse = serde_path_to_error::deserialize(deserializer)
        .map_err(|e| anyhow::anyhow!("malformed completion response at {}: {}", e.path(), e.inner()))?;
    response
        .into_text()
        .context("completion response carried no candidate text")
}

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    async fn try_complete(&self, prompt: &str) -> anyhow::Result<String> {
        let resp = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest::new(prompt))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("completion request failed ({status}): {text}");
        }

        let body = resp.bytes().await.map_err(reqwest::Error::without_url)?;
        parse_reply(&body)
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn complete(&self, prompt: &str) -> String {
        let start = Instant::now();
        let result = self.try_complete(prompt).await;
        log_if_slow(start, Duration::from_secs(5), "completion request");

        match result {
            Ok(text) => {
                debug!(
                    duration = fmt_duration(start.elapsed()),
                    reply_len = text.len(),
                    "completion received"
                );
                text
            }
            Err(e) => {
                warn!(
                    error = format!("{e:#}"),
                    duration = fmt_duration(start.elapsed()),
                    "completion request failed, treating as empty reply"
                );
                String::new()
            }
        }
    }
}
