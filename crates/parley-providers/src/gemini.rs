// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini generateContent adapter.
//!
//! The only multimodal adapter: inline data-URL attachments become
//! `inline_data` parts, file references become `file_data` parts. There is
//! no incremental API here; the default stream synthesizes one delta
//! carrying the whole reply.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_config::ProvidersConfig;
use parley_core::{
    AttachmentData, GenerateRequest, NormalizedMessage, ParleyError, Provider, ProviderAdapter,
    Role,
};

use crate::error::resolve_upstream_message;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
    FileData { file_data: FileData },
}

#[derive(Debug, Serialize)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Adapter for the Gemini generateContent API.
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiAdapter {
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
                .gemini_base_url
                .as_deref()
                .unwrap_or(GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn wire_request(request: &GenerateRequest) -> GenerateContentRequest {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(Part::Text {
                    text: msg.content.clone(),
                }),
                Role::User | Role::Assistant => contents.push(Content {
                    role: Some(wire_role(msg.role).to_string()),
                    parts: message_parts(msg),
                }),
            }
        }
        GenerateContentRequest {
            contents,
            system_instruction: if system_parts.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: system_parts,
                })
            },
        }
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        _ => "user",
    }
}

fn message_parts(msg: &NormalizedMessage) -> Vec<Part> {
    let mut parts = Vec::new();
    if !msg.content.is_empty() {
        parts.push(Part::Text {
            text: msg.content.clone(),
        });
    }
    for attachment in &msg.attachments {
        match &attachment.data {
            AttachmentData::DataUrl(_) => {
                if let Some(b64) = attachment.inline_base64() {
                    parts.push(Part::InlineData {
                        inline_data: Blob {
                            mime_type: attachment.mime_type.clone(),
                            data: b64.to_string(),
                        },
                    });
                }
            }
            AttachmentData::FileUri(uri) => parts.push(Part::FileData {
                file_data: FileData {
                    mime_type: attachment.mime_type.clone(),
                    file_uri: uri.clone(),
                },
            }),
        }
    }
    parts
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn supports_multimodal(&self) -> bool {
        true
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ParleyError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = Self::wire_request(&request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", request.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ParleyError::Upstream {
                message: format!("gemini request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "gemini response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let fallback = format!("gemini returned HTTP {status}");
            return Err(ParleyError::upstream(resolve_upstream_message(
                &body, &fallback,
            )));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| ParleyError::Upstream {
                message: "gemini returned an unparseable response".to_string(),
                source: Some(Box::new(e)),
            })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ParleyError::upstream("gemini returned no candidates"));
        }
        Ok(text)
    }
}
