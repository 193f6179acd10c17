// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order: compiled defaults, then `~/.config/parley/parley.toml`, then
//! `./parley.toml`, then `PARLEY_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ParleyConfig;

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("parley/parley.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("parley.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used by tests and embedded configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment variable provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay unambiguous: `PARLEY_RATE_LIMIT_MAX_HITS` maps to
/// `rate_limit.max_hits`, not `rate.limit.max.hits`.
fn env_provider() -> Env {
    Env::prefixed("PARLEY_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("secrets_", "secrets.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("rate_limit_", "rate_limit.", 1)
            .replacen("key_cache_", "key_cache.", 1)
            .replacen("providers_", "providers.", 1);
        mapped.into()
    })
}
