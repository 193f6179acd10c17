// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the relay.
//!
//! Routes:
//! - `POST /v1/chat` — one chat turn, streamed over SSE or returned as JSON
//! - `PUT /v1/keys` — store/rotate a provider key
//! - `DELETE /v1/keys/{provider}` — revoke a provider key
//! - `GET /v1/keys` — list providers with a stored key
//! - `GET /health` — liveness

pub mod chat;
pub mod error;
pub mod extract;
pub mod keys;
pub mod server;

pub use server::{GatewayState, build_router, start_server};
