//! Name suggestion service client.
//!
//! Asks an OpenAI-compatible chat completions endpoint for a normalized display name.
//! Failures never abort the pipeline: they degrade to a synthesized fallback label.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::MediaEntry;

pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
pub const DEFAULT_MODEL: &str = "grok-3";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 50;

/// Label prefix used when the service call failed.
pub const FAILURE_FALLBACK_PREFIX: &str = "Oracle_Suggested_";
/// Label prefix used when the service answered with nothing.
pub const EMPTY_FALLBACK_PREFIX: &str = "Error_Suggesting_Name_";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_SYSTEM_PROMPT: &str = "Follow these rules: \
1. Output only the suggested file name itself, without any explanation. \
2. Keep the name short and focused on the core information so it is easy to archive. \
3. Keep key identifying information such as title, song name, year and season/episode numbers \
(for example: Mind Hunter (2021) S1 EP01), but drop meaningless words and random characters. \
4. Prefer the commonly known title of the work. \
5. Do not add a file extension (like .mp4 or .mp3) and do not add extra punctuation.";

/// Connection settings for the naming service, injected at construction time.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Bearer token for the service. Requests fail with `MissingCredential` when absent.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
}

/// Input for a single suggestion.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionRequest<'a> {
    pub file_path: &'a Path,
    pub folder_name: &'a str,
    pub original_name: &'a str,
}

/// Classified failure of a single suggestion call.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Result of asking for a name, always carrying a usable label.
#[derive(Debug)]
pub enum SuggestionOutcome {
    /// The service produced a name.
    Named(String),
    /// The service answered but produced nothing usable.
    Empty(String),
    /// The call failed, a fallback label was synthesized.
    Failed { fallback: String, error: OracleError },
}

/// Anything that can propose a display name for a media file.
#[allow(async_fn_in_trait)]
pub trait NameOracle {
    /// Returns `Ok(None)` when the service answered without a usable name.
    async fn suggest(&self, request: SuggestionRequest<'_>) -> Result<Option<String>, OracleError>;
}

/// OpenAI-compatible chat completions client.
#[derive(Debug)]
pub struct ChatOracle {
    client: Client,
    config: OracleConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
        }
    }
}

impl<'a> From<&'a MediaEntry> for SuggestionRequest<'a> {
    fn from(entry: &'a MediaEntry) -> Self {
        Self {
            file_path: &entry.original_path,
            folder_name: &entry.folder_context,
            original_name: &entry.original_name,
        }
    }
}

impl SuggestionOutcome {
    /// The name to record in the ledger.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) | Self::Empty(name) | Self::Failed { fallback: name, .. } => name.as_str(),
        }
    }

    #[must_use]
    pub fn into_name(self) -> String {
        match self {
            Self::Named(name) | Self::Empty(name) | Self::Failed { fallback: name, .. } => name,
        }
    }
}

impl ChatOracle {
    /// Create a new client with the given settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn system_prompt(&self) -> &str {
        self.config.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

impl NameOracle for ChatOracle {
    async fn suggest(&self, request: SuggestionRequest<'_>) -> Result<Option<String>, OracleError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(OracleError::MissingCredential)?;

        let prompt = build_user_prompt(request);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: self.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(OracleError::Status { status, body: text });
        }

        parse_completion(&text)
    }
}

/// Ask the oracle for a name and degrade any failure to a fallback label.
pub async fn suggest_name<O: NameOracle>(oracle: &O, entry: &MediaEntry) -> SuggestionOutcome {
    match oracle.suggest(SuggestionRequest::from(entry)).await {
        Ok(Some(name)) => SuggestionOutcome::Named(name),
        Ok(None) => SuggestionOutcome::Empty(format!("{EMPTY_FALLBACK_PREFIX}{}", entry.original_name)),
        Err(error) => SuggestionOutcome::Failed {
            fallback: format!("{FAILURE_FALLBACK_PREFIX}{}", entry.original_name),
            error,
        },
    }
}

fn build_user_prompt(request: SuggestionRequest<'_>) -> String {
    format!(
        "Suggest a concise, normalized file name based on the following information \
        (reply with the suggested name only, no explanation):\n\n\
        File path: {}\n\
        Folder name: {}\n\
        Original file name: {}",
        request.file_path.display(),
        request.folder_name,
        request.original_name
    )
}

/// Extract the suggested name from a chat completions response body.
fn parse_completion(body: &str) -> Result<Option<String>, OracleError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|error| OracleError::MalformedResponse(error.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::MalformedResponse("response has no choices".to_string()))?
        .message
        .content
        .unwrap_or_default();

    Ok(first_line(&content))
}

/// First non-blank line, trimmed. Suggestions are single-line.
fn first_line(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
}
