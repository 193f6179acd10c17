// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API adapter.
//!
//! The only adapter with vendor-typed SSE: events arrive named
//! (`content_block_delta`, `message_stop`, ...) and are parsed through
//! `eventsource-stream` rather than re-split by hand. Dropping the delta
//! stream drops the HTTP response and aborts the generation upstream.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_config::ProvidersConfig;
use parley_core::{
    DeltaStream, GenerateRequest, ParleyError, Provider, ProviderAdapter, Role,
};

use crate::error::resolve_upstream_message;

const CLAUDE_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SseContentBlockDelta {
    delta: SseDelta,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum SseDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SseError {
    error: SseErrorDetail,
}

#[derive(Debug, Deserialize)]
struct SseErrorDetail {
    message: String,
}

/// Adapter for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct ClaudeAdapter {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    max_tokens: u32,
}

impl ClaudeAdapter {
    pub fn new(config: &ProvidersConfig) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ParleyError::Upstream {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: config
                .claude_base_url
                .as_deref()
                .unwrap_or(CLAUDE_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_version: config.claude_api_version.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Build the wire request. The Messages API takes the system prompt as a
    /// top-level field, not a message role.
    fn wire_request(&self, request: &GenerateRequest, stream: bool) -> MessageRequest {
        let mut system_parts = Vec::new();
        let mut messages = Vec::new();
        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(msg.content.clone()),
                Role::User | Role::Assistant => messages.push(WireMessage {
                    role: msg.role.to_string(),
                    content: msg.content.clone(),
                }),
            }
        }
        MessageRequest {
            model: request.model.clone(),
            max_tokens: self.max_tokens,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n\n"))
            },
            messages,
            stream,
        }
    }

    async fn send(
        &self,
        request: &GenerateRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ParleyError> {
        let body = self.wire_request(request, stream);
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", request.api_key.expose_secret())
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| ParleyError::Upstream {
                message: format!("claude request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, stream, "claude response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let fallback = format!("claude returned HTTP {status}");
            return Err(ParleyError::upstream(resolve_upstream_message(
                &body, &fallback,
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ParleyError> {
        let response = self.send(&request, false).await?;
        let parsed: MessageResponse =
            response.json().await.map_err(|e| ParleyError::Upstream {
                message: "claude returned an unparseable response".to_string(),
                source: Some(Box::new(e)),
            })?;
        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        Ok(text)
    }

    async fn generate_stream(&self, request: GenerateRequest) -> Result<DeltaStream, ParleyError> {
        let response = self.send(&request, true).await?;
        let events = response.bytes_stream().eventsource();

        let deltas = events.filter_map(|result| async move {
            match result {
                Ok(event) => match event.event.as_str() {
                    "content_block_delta" => {
                        match serde_json::from_str::<SseContentBlockDelta>(&event.data) {
                            Ok(SseContentBlockDelta {
                                delta: SseDelta::TextDelta { text },
                            }) if !text.is_empty() => Some(Ok(text)),
                            // Non-text deltas and parse failures carry no tokens.
                            _ => None,
                        }
                    }
                    "error" => {
                        let message = serde_json::from_str::<SseError>(&event.data)
                            .map(|e| e.error.message)
                            .unwrap_or_else(|_| "claude stream error".to_string());
                        Some(Err(ParleyError::upstream(message)))
                    }
                    // message_start, ping, message_stop, and future event
                    // types carry no token text.
                    _ => None,
                },
                Err(e) => Some(Err(ParleyError::upstream(format!("SSE stream error: {e}")))),
            }
        });
        Ok(Box::pin(deltas))
    }
}
