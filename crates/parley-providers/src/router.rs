// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider selection and message-list assembly.
//!
//! The router owns the closed adapter set. Before dispatch it prepends the
//! thread's system prompt (when set) and applies the capability gate:
//! adapters that do not declare multimodal support receive text-only
//! history, attachments silently dropped. That drop is deliberate; sending
//! image parts to a text-only vendor is a hard API error.

use std::collections::HashMap;

use tracing::debug;

use parley_config::ProvidersConfig;
use parley_core::{
    DeltaStream, GenerateRequest, NormalizedMessage, ParleyError, Provider, ProviderAdapter, Role,
};

use crate::claude::ClaudeAdapter;
use crate::compat::CompatAdapter;
use crate::gemini::GeminiAdapter;

/// Dispatches chat generations to the adapter for the requested provider.
pub struct ProviderRouter {
    adapters: HashMap<Provider, Box<dyn ProviderAdapter>>,
}

impl ProviderRouter {
    /// The full production adapter set.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ParleyError> {
        Ok(Self::new(vec![
            Box::new(CompatAdapter::openai(config)?),
            Box::new(CompatAdapter::mistral(config)?),
            Box::new(CompatAdapter::groq(config)?),
            Box::new(ClaudeAdapter::new(config)?),
            Box::new(GeminiAdapter::new(config)?),
        ]))
    }

    /// Build a router from an explicit adapter list, keyed by each adapter's
    /// declared provider.
    pub fn new(adapters: Vec<Box<dyn ProviderAdapter>>) -> Self {
        Self {
            adapters: adapters
                .into_iter()
                .map(|adapter| (adapter.provider(), adapter))
                .collect(),
        }
    }

    fn adapter(&self, provider: Provider) -> Result<&dyn ProviderAdapter, ParleyError> {
        self.adapters
            .get(&provider)
            .map(|a| a.as_ref())
            .ok_or_else(|| ParleyError::UnsupportedProvider(provider.to_string()))
    }

    /// Assemble the normalized list and apply the capability gate.
    fn prepare(
        adapter: &dyn ProviderAdapter,
        system_prompt: Option<&str>,
        mut request: GenerateRequest,
    ) -> GenerateRequest {
        if let Some(prompt) = system_prompt {
            request
                .messages
                .insert(0, NormalizedMessage::text(Role::System, prompt));
        }
        if !adapter.supports_multimodal() {
            for msg in &mut request.messages {
                msg.attachments.clear();
            }
        }
        request
    }

    /// Run one full (non-streaming) generation.
    pub async fn generate(
        &self,
        provider: Provider,
        system_prompt: Option<&str>,
        request: GenerateRequest,
    ) -> Result<String, ParleyError> {
        let adapter = self.adapter(provider)?;
        debug!(provider = %provider, model = %request.model, "dispatching generation");
        adapter
            .generate(Self::prepare(adapter, system_prompt, request))
            .await
    }

    /// Run one streaming generation.
    pub async fn generate_stream(
        &self,
        provider: Provider,
        system_prompt: Option<&str>,
        request: GenerateRequest,
    ) -> Result<DeltaStream, ParleyError> {
        let adapter = self.adapter(provider)?;
        debug!(provider = %provider, model = %request.model, "dispatching streaming generation");
        adapter
            .generate_stream(Self::prepare(adapter, system_prompt, request))
            .await
    }
}
