// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Parley chat relay.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query modules for
//! threads, chat messages, encrypted provider keys, and rate-limit counters.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{Database, now_rfc3339};
pub use models::*;
