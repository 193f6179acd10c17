// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Parley chat relay.
//!
//! TOML files merged through Figment with `PARLEY_` environment variable
//! overrides. All sections are optional and default to sensible values.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{ParleyConfig, ProvidersConfig};
