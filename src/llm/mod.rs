//! Generation capability client
//!
//! This module provides the text completion/generation capability the
//! pipeline stages depend on:
//! - Plain text completions
//! - Structured (single JSON object) completions with typed contracts
//! - Streaming completions
//!
//! The HTTP transport lives in [`client`]; stages talk to the
//! [`CompletionBackend`] trait so tests can inject an in-process backend.

pub mod client;
pub mod prompts;
pub mod streaming;

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

pub use client::HttpCompletionClient;
pub use streaming::StreamingResponse;

use crate::errors::Result;
use crate::errors::WealthRagError;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request sent to the generation capability
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Request a single JSON object instead of free text
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: 0.2,
            max_tokens: 2000,
            json_mode: false,
        }
    }

    #[must_use]
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Backend seam for the generation capability
///
/// The production implementation is [`HttpCompletionClient`]; tests inject
/// scripted backends.
pub trait CompletionBackend: Send + Sync {
    /// Run a completion and return the full response text
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String>>;

    /// Run a completion and return a stream of text chunks
    fn complete_stream(&self, request: CompletionRequest)
        -> BoxFuture<'_, Result<StreamingResponse>>;
}

/// Service wrapper over a completion backend
///
/// Adds the structured-output contract handling shared by the planner,
/// retriever extractions and the groundedness verifier.
#[derive(Clone)]
pub struct LlmService {
    backend: Arc<dyn CompletionBackend>,
}

impl LlmService {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Create the HTTP-backed service from application config
    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        let client = HttpCompletionClient::from_config(config)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Run a plain text completion
    pub async fn complete_text(&self, request: CompletionRequest) -> Result<String> {
        self.backend.complete(request).await
    }

    /// Run a streaming completion
    pub async fn complete_stream(&self, request: CompletionRequest) -> Result<StreamingResponse> {
        self.backend.complete_stream(request).await
    }

    /// Run a completion that must return a single structured JSON object
    ///
    /// The raw response is stripped of any markdown code fences before
    /// parsing. A response that does not deserialize into `T` yields
    /// [`WealthRagError::StructuredOutput`]; callers decide whether that is
    /// fatal (query planning) or recoverable (entity extraction).
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        request: CompletionRequest,
    ) -> Result<T> {
        let raw = self.backend.complete(request.with_json_mode()).await?;
        let cleaned = strip_code_fences(&raw);

        serde_json::from_str(cleaned)
            .map_err(|e| WealthRagError::StructuredOutput(format!("{e}: {cleaned}")))
    }
}

/// Strip markdown code fences some models wrap JSON output in
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
