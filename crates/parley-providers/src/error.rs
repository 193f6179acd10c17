// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Uniform user-facing error text for upstream failures.
//!
//! Every vendor wraps errors differently; this module is the single place
//! that flattens them. Nothing upstream-shaped (raw payloads, stack traces,
//! request ids) may reach the client except through here.

/// Fallback when no usable message can be extracted.
pub const GENERIC_ERROR: &str = "Internal server error";

/// Longest message shown to a client before truncation.
const MAX_MESSAGE_LEN: usize = 350;

/// Extract and format a user-facing message from a raw error payload.
///
/// Returns `None` when nothing usable is present. For a JSON payload the
/// candidates are tried in order: `error.message`, `error` as a string, then
/// top-level `message`. The result is newline-collapsed and truncated to 350
/// characters with a trailing ellipsis.
pub fn format_provider_error_message(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let text = if trimmed.starts_with('{') {
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => extract_json_message(&value)?,
            Err(_) => trimmed.to_string(),
        }
    } else {
        trimmed.to_string()
    };

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(truncate(collapsed))
}

/// The message shown to a client for an upstream error body.
///
/// Priority: the response body's structured message, then `fallback` (the
/// transport-level description), then the generic text.
pub fn resolve_upstream_message(body: &str, fallback: &str) -> String {
    format_provider_error_message(body)
        .or_else(|| format_provider_error_message(fallback))
        .unwrap_or_else(|| GENERIC_ERROR.to_string())
}

fn extract_json_message(value: &serde_json::Value) -> Option<String> {
    if let Some(msg) = value.pointer("/error/message").and_then(|v| v.as_str()) {
        return Some(msg.to_string());
    }
    if let Some(msg) = value.pointer("/error").and_then(|v| v.as_str()) {
        return Some(msg.to_string());
    }
    if let Some(msg) = value.pointer("/message").and_then(|v| v.as_str()) {
        return Some(msg.to_string());
    }
    None
}

fn truncate(mut text: String) -> String {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        return text;
    }
    let cut = text
        .char_indices()
        .nth(MAX_MESSAGE_LEN)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.truncate(cut);
    text.push_str("...");
    text
}
