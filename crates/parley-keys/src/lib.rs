// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider API-key lifecycle.
//!
//! [`KeyCache`] holds decrypted keys in memory for a bounded TTL so each
//! chat request does not pay a DB read plus a vault decrypt. [`KeyService`]
//! is the only writer: it encrypts before every store and invalidates the
//! cache on every mutation.

pub mod cache;
pub mod service;

pub use cache::KeyCache;
pub use service::KeyService;
