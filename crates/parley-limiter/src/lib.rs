// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable per-identity rate limiting.
//!
//! Counters live in SQLite, not memory, so a process restart does not hand
//! out a fresh window. One row per `(identity, route)` pair; windows are
//! fixed-length and start on the first hit.

pub mod store;

pub use store::{Hit, RateLimitStore};
