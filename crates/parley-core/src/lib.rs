// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley chat relay.
//!
//! This crate provides the error type, the shared request/response types, and
//! the [`ProviderAdapter`] trait that every LLM provider integration
//! implements. Everything else in the workspace builds on these definitions.

pub mod error;
pub mod provider;
pub mod types;

pub use error::ParleyError;
pub use provider::{DeltaStream, ProviderAdapter};
pub use types::{
    Attachment, AttachmentData, AttachmentKind, GenerateRequest, NormalizedMessage, Provider,
    Role, StreamEvent,
};
