// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for LLM provider integrations.

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream;
use futures_core::Stream;

use crate::error::ParleyError;
use crate::types::{GenerateRequest, Provider};

/// A cancellable sequence of text deltas from a streaming generation.
///
/// Dropping the stream aborts the in-flight vendor request; callers propagate
/// client disconnection by simply letting the stream go out of scope.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ParleyError>> + Send>>;

/// Adapter for one LLM vendor, normalizing its native API into the relay's
/// uniform generate/stream contract.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    /// Which provider this adapter serves.
    fn provider(&self) -> Provider;

    /// Whether this adapter accepts non-text history entries (images,
    /// documents). Adapters that return false receive text-only history;
    /// the router drops attachments before dispatch.
    fn supports_multimodal(&self) -> bool {
        false
    }

    /// Run a generation to completion and return the full reply text.
    async fn generate(&self, request: GenerateRequest) -> Result<String, ParleyError>;

    /// Run a generation and return incremental text deltas.
    ///
    /// Vendors without a native incremental API use this default, which
    /// yields the whole reply as a single delta once the call resolves.
    /// Callers must not assume every provider streams token-by-token.
    async fn generate_stream(&self, request: GenerateRequest) -> Result<DeltaStream, ParleyError> {
        let reply = self.generate(request).await?;
        Ok(Box::pin(stream::iter([Ok(reply)])))
    }
}
