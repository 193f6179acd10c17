// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.

use serde::{Deserialize, Serialize};

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub user_id: String,
    /// Optional system prompt applied to every turn in this thread.
    pub system_prompt: Option<String>,
    pub created_at: String,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub thread_id: String,
    /// "system", "user", or "assistant".
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// An encrypted provider API key. The ciphertext is opaque to storage; only
/// the vault can read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderKeyRecord {
    pub user_id: String,
    pub provider: String,
    pub ciphertext: String,
    pub updated_at: String,
}

/// A durable rate-limit counter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub total_hits: u32,
    /// Window end, unix milliseconds.
    pub expire_at: i64,
}
