// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat-completions adapter.
//!
//! OpenAI, Mistral, and Groq speak the same wire format; one adapter serves
//! all three, parameterized by base URL and vendor name. Streaming goes
//! through the raw SSE re-parser in [`crate::sse`].

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_config::ProvidersConfig;
use parley_core::{
    DeltaStream, GenerateRequest, NormalizedMessage, ParleyError, Provider, ProviderAdapter,
};

use crate::error::resolve_upstream_message;
use crate::sse;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<&NormalizedMessage> for WireMessage {
    fn from(msg: &NormalizedMessage) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Adapter for any vendor speaking the OpenAI chat-completions protocol.
#[derive(Debug, Clone)]
pub struct CompatAdapter {
    provider: Provider,
    client: reqwest::Client,
    base_url: String,
}

impl CompatAdapter {
    pub fn openai(config: &ProvidersConfig) -> Result<Self, ParleyError> {
        Self::new(Provider::Openai, config.openai_base_url.as_deref(), OPENAI_BASE_URL)
    }

    pub fn mistral(config: &ProvidersConfig) -> Result<Self, ParleyError> {
        Self::new(Provider::Mistral, config.mistral_base_url.as_deref(), MISTRAL_BASE_URL)
    }

    pub fn groq(config: &ProvidersConfig) -> Result<Self, ParleyError> {
        Self::new(Provider::Groq, config.groq_base_url.as_deref(), GROQ_BASE_URL)
    }

    fn new(
        provider: Provider,
        override_url: Option<&str>,
        default_url: &str,
    ) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ParleyError::Upstream {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            provider,
            client,
            base_url: override_url
                .unwrap_or(default_url)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn send(
        &self,
        request: &GenerateRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ParleyError> {
        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            stream,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(request.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ParleyError::Upstream {
                message: format!("{} request failed: {e}", self.provider),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(provider = %self.provider, status = %status, stream, "chat completion response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let fallback = format!("{} returned HTTP {status}", self.provider);
            return Err(ParleyError::upstream(resolve_upstream_message(
                &body, &fallback,
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for CompatAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ParleyError> {
        let response = self.send(&request, false).await?;
        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| ParleyError::Upstream {
                message: format!("{} returned an unparseable response", self.provider),
                source: Some(Box::new(e)),
            })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ParleyError::upstream(format!("{} returned no completion choices", self.provider))
            })
    }

    async fn generate_stream(&self, request: GenerateRequest) -> Result<DeltaStream, ParleyError> {
        let response = self.send(&request, true).await?;
        Ok(sse::parse_compat_stream(response))
    }
}
