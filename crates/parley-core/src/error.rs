// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley chat relay.

use thiserror::Error;

/// The primary error type used across all Parley crates.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Rate limit exceeded; the request was rejected before any credential
    /// lookup or provider call.
    #[error("rate limit exceeded, retry after {retry_after_ms}ms")]
    AdmissionDenied { retry_after_ms: u64 },

    /// Missing provider key, or a stored ciphertext that failed to decrypt.
    #[error("credential error: {0}")]
    Credential(String),

    /// Requested provider has no configured adapter.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// A failure surfaced by a vendor API call. The message is raw at this
    /// layer; the gateway runs it through the uniform error resolver before
    /// anything reaches a client.
    #[error("provider error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The client disconnected while a generation was in flight.
    #[error("request canceled by client")]
    Canceled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Convenience constructor for upstream errors without a source.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            source: None,
        }
    }
}
