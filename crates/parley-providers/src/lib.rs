// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapters and the router that dispatches to them.
//!
//! Each adapter normalizes one vendor's HTTP surface into the
//! [`ProviderAdapter`](parley_core::ProviderAdapter) contract. The closed set
//! is {openai, gemini, claude, mistral, groq}; openai, mistral, and groq
//! share one OpenAI-compatible wire format and differ only in base URL.

pub mod claude;
pub mod compat;
pub mod error;
pub mod gemini;
pub mod router;
pub mod sse;

pub use router::ProviderRouter;
