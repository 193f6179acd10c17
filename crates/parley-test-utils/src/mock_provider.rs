// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use parley_core::{DeltaStream, GenerateRequest, ParleyError, Provider, ProviderAdapter};

/// One scripted outcome for a generate call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Resolve with this full reply (streams as one delta).
    Reply(String),
    /// Stream these deltas, then finish.
    Deltas(Vec<String>),
    /// Fail with an upstream error carrying this message.
    Error(String),
}

/// A mock provider that pops responses from a FIFO queue.
///
/// When the queue is empty, a default "mock response" text is returned.
pub struct MockProvider {
    provider: Provider,
    multimodal: bool,
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
}

impl MockProvider {
    /// Create a mock for the given provider with an empty response queue.
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            multimodal: false,
            responses: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a mock pre-loaded with the given responses.
    pub fn with_responses(provider: Provider, responses: Vec<MockResponse>) -> Self {
        Self {
            provider,
            multimodal: false,
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
        }
    }

    /// Declare the mock as multimodal-capable.
    pub fn multimodal(mut self) -> Self {
        self.multimodal = true;
        self
    }

    /// Add a response to the end of the queue.
    pub async fn push(&self, response: MockResponse) {
        self.responses.lock().await.push_back(response);
    }

    async fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockResponse::Reply("mock response".to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn supports_multimodal(&self) -> bool {
        self.multimodal
    }

    async fn generate(&self, _request: GenerateRequest) -> Result<String, ParleyError> {
        match self.next_response().await {
            MockResponse::Reply(text) => Ok(text),
            MockResponse::Deltas(deltas) => Ok(deltas.concat()),
            MockResponse::Error(message) => Err(ParleyError::upstream(message)),
        }
    }

    async fn generate_stream(&self, _request: GenerateRequest) -> Result<DeltaStream, ParleyError> {
        match self.next_response().await {
            MockResponse::Reply(text) => Ok(Box::pin(stream::iter([Ok(text)]))),
            MockResponse::Deltas(deltas) => {
                Ok(Box::pin(stream::iter(deltas.into_iter().map(Ok))))
            }
            MockResponse::Error(message) => Err(ParleyError::upstream(message)),
        }
    }
}
