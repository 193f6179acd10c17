// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Parley workspace.
//!
//! Wire-facing types keep camelCase field names so existing relay clients
//! stay compatible.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The closed set of supported LLM providers.
///
/// Anything outside this enum is unrepresentable; there is no runtime plugin
/// registration for providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Openai,
    Gemini,
    Claude,
    Mistral,
    Groq,
}

impl Provider {
    /// All providers, in a stable order (used by key listing).
    pub const ALL: [Provider; 5] = [
        Provider::Openai,
        Provider::Gemini,
        Provider::Claude,
        Provider::Mistral,
        Provider::Groq,
    ];
}

/// Role of a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// How an attachment's payload is referenced. Binary data never lands in the
/// relay's own storage; it is passed through to the provider or referenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentData {
    /// Inline `data:` URL (base64 payload after the comma).
    DataUrl(String),
    /// Reference to an externally hosted file.
    FileUri(String),
}

/// A user-supplied attachment on a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Optional client-side identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// MIME type as reported by the client.
    pub mime_type: String,
    /// Payload reference.
    #[serde(flatten)]
    pub data: AttachmentData,
}

impl Attachment {
    /// Classify the attachment by MIME sniffing.
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_mime(&self.mime_type)
    }

    /// The base64 payload of an inline data URL, if this attachment carries one.
    pub fn inline_base64(&self) -> Option<&str> {
        match &self.data {
            AttachmentData::DataUrl(url) => url.split_once(',').map(|(_, b64)| b64),
            AttachmentData::FileUri(_) => None,
        }
    }
}

/// Coarse attachment classification used by the capability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Document,
    File,
}

impl AttachmentKind {
    /// Classify a MIME type. Images by prefix, common text/document types as
    /// documents, everything else as an opaque file.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            AttachmentKind::Image
        } else if mime.starts_with("text/")
            || mime == "application/pdf"
            || mime == "application/json"
            || mime.contains("wordprocessingml")
            || mime == "application/msword"
        {
            AttachmentKind::Document
        } else {
            AttachmentKind::File
        }
    }
}

/// The provider-agnostic message form all adapters consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl NormalizedMessage {
    /// A plain text message with no attachments.
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

/// One generation request handed to a provider adapter.
///
/// The API key is already decrypted at this point; [`SecretString`] keeps it
/// out of Debug output and logs.
pub struct GenerateRequest {
    pub api_key: SecretString,
    pub model: String,
    pub messages: Vec<NormalizedMessage>,
}

impl std::fmt::Debug for GenerateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateRequest")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .finish()
    }
}

/// The wire representation of one chat generation's lifecycle, serialized as
/// the JSON payload of each SSE `data:` line.
///
/// A stream is zero or more `delta` events followed by exactly one terminal
/// `done` or `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Delta {
        content: String,
    },
    Done {
        reply: String,
        #[serde(rename = "threadId")]
        thread_id: String,
    },
    Error {
        error: String,
    },
}
