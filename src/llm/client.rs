//! HTTP client for OpenAI-compatible chat completion APIs

use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::CompletionBackend;
use super::CompletionRequest;
use super::StreamingResponse;
use crate::errors::Result;
use crate::errors::WealthRagError;

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint
///
/// Both hosted APIs and local Ollama expose this surface, so one client
/// covers local development and production deployments.
pub struct HttpCompletionClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl HttpCompletionClient {
    /// Create a new completion client
    pub fn new(endpoint: String, api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| WealthRagError::Http(e.to_string()))?;

        Ok(Self {
            endpoint,
            api_key,
            model,
            client,
        })
    }

    /// Create from application config
    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        Self::new(
            config.llm_endpoint().to_string(),
            config.llm_key().to_string(),
            config.llm_model().to_string(),
        )
    }

    fn build_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": stream,
        });
        if request.json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {} (stream: {})", url, stream);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_body(request, stream))
            .send()
            .await
            .map_err(|e| WealthRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(WealthRagError::Generation(format!(
                "Chat completions API error ({status}): {error_text}"
            )));
        }

        Ok(response)
    }
}

impl CompletionBackend for HttpCompletionClient {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            #[derive(Deserialize)]
            struct CompletionResponse {
                choices: Vec<Choice>,
            }

            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMessage,
            }

            #[derive(Deserialize)]
            struct ChoiceMessage {
                content: String,
            }

            let response = self.send(&request, false).await?;
            let result: CompletionResponse = response
                .json()
                .await
                .map_err(|e| WealthRagError::Generation(format!("Failed to parse response: {e}")))?;

            result
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| WealthRagError::Generation("No choices in response".to_string()))
        })
    }

    fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'_, Result<StreamingResponse>> {
        Box::pin(async move {
            let response = self.send(&request, true).await?;
            let byte_stream = response.bytes_stream();

            // Server-sent events: buffer bytes, emit one delta per data line
            let stream = futures::stream::try_unfold(
                (byte_stream, String::new()),
                |(mut bytes, mut buffer)| async move {
                    loop {
                        if let Some(pos) = buffer.find('\n') {
                            let line: String = buffer.drain(..=pos).collect();
                            let line = line.trim();
                            if let Some(data) = line.strip_prefix("data: ") {
                                if data == "[DONE]" {
                                    return Ok(None);
                                }
                                if let Some(delta) = parse_stream_delta(data)? {
                                    return Ok(Some((delta, (bytes, buffer))));
                                }
                            }
                            continue;
                        }
                        match bytes.next().await {
                            Some(Ok(chunk)) => {
                                buffer.push_str(&String::from_utf8_lossy(&chunk));
                            }
                            Some(Err(e)) => return Err(WealthRagError::Http(e.to_string())),
                            None => return Ok(None),
                        }
                    }
                },
            );

            Ok(StreamingResponse::new(Box::pin(stream)))
        })
    }
}

/// Extract the content delta from one SSE data payload
fn parse_stream_delta(data: &str) -> Result<Option<String>> {
    #[derive(Deserialize)]
    struct StreamChunk {
        choices: Vec<StreamChoice>,
    }

    #[derive(Deserialize)]
    struct StreamChoice {
        delta: StreamDelta,
    }

    #[derive(Deserialize)]
    struct StreamDelta {
        #[serde(default)]
        content: Option<String>,
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| WealthRagError::Generation(format!("Failed to parse stream chunk: {e}")))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty()))
}
