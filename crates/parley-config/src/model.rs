// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley chat relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Application secrets.
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-user chat admission limits.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Decrypted-key cache settings.
    #[serde(default)]
    pub key_cache: KeyCacheConfig,

    /// Provider endpoint overrides and generation defaults.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8460
}

/// Application secrets.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SecretsConfig {
    /// Static application secret used to derive the at-rest key-encryption
    /// key. Required to serve; typically set via `PARLEY_SECRETS_APP_SECRET`.
    #[serde(default)]
    pub app_secret: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database file path. `:memory:`-style paths are not supported;
    /// the relay relies on durability across restarts.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("parley/parley.db").to_string_lossy().into_owned())
        .unwrap_or_else(|| "parley.db".to_string())
}

/// Per-user chat admission limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Window length in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Maximum admitted hits per identity+route within one window.
    #[serde(default = "default_max_hits")]
    pub max_hits: u32,

    /// Interval between sweeps of expired counter rows, in seconds.
    #[serde(default = "default_limit_sweep_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_hits: default_max_hits(),
            sweep_interval_secs: default_limit_sweep_secs(),
        }
    }
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_max_hits() -> u32 {
    20
}

fn default_limit_sweep_secs() -> u64 {
    60
}

/// Decrypted-key cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyCacheConfig {
    /// Time-to-live for a cached decrypted key, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval between sweeps of expired cache entries, in seconds.
    #[serde(default = "default_cache_sweep_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for KeyCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            sweep_interval_secs: default_cache_sweep_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_sweep_secs() -> u64 {
    600
}

/// Provider endpoint overrides and generation defaults.
///
/// Base URLs default to the real vendor endpoints; overrides exist for
/// self-hosted gateways and test harnesses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    /// OpenAI chat-completions base URL.
    #[serde(default)]
    pub openai_base_url: Option<String>,

    /// Mistral chat-completions base URL.
    #[serde(default)]
    pub mistral_base_url: Option<String>,

    /// Groq chat-completions base URL.
    #[serde(default)]
    pub groq_base_url: Option<String>,

    /// Anthropic Messages API base URL.
    #[serde(default)]
    pub claude_base_url: Option<String>,

    /// Google Gemini generateContent base URL.
    #[serde(default)]
    pub gemini_base_url: Option<String>,

    /// Anthropic API version header.
    #[serde(default = "default_claude_api_version")]
    pub claude_api_version: String,

    /// Maximum tokens to generate per response (providers that require it).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_base_url: None,
            mistral_base_url: None,
            groq_base_url: None,
            claude_base_url: None,
            gemini_base_url: None,
            claude_api_version: default_claude_api_version(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_claude_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}
