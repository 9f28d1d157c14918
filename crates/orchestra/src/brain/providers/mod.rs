//! Multi-provider LLM abstraction layer
//!
//! One trait with a single `generate` operation; the concrete provider is
//! picked at construction time from [`ProviderType`].

mod anthropic;
mod openai;
mod provider_trait;

use std::{sync::Arc, time::Duration};

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;
pub use provider_trait::{
    ChatConfig, ChatMessage, ChatRequest, LLMProviderTrait, MessageRole, ProviderError,
    ProviderType,
};

use crate::config::LlmSettings;

/// Build the configured provider
pub fn create_provider(settings: &LlmSettings) -> Result<Arc<dyn LLMProviderTrait>, ProviderError> {
    let timeout = Duration::from_secs(settings.timeout_secs);

    let provider: Arc<dyn LLMProviderTrait> = match settings.provider {
        ProviderType::Anthropic => {
            let mut provider = AnthropicProvider::new(settings.api_key.clone(), timeout)?;
            if let Some(ref endpoint) = settings.endpoint {
                provider = provider.with_endpoint(endpoint);
            }
            Arc::new(provider)
        }
        provider_type => {
            let mut provider = OpenAIProvider::new(provider_type, settings.api_key.clone(), timeout)?;
            if let Some(ref endpoint) = settings.endpoint {
                provider = provider.with_endpoint(endpoint);
            }
            Arc::new(provider)
        }
    };

    tracing::info!(
        "Using {} provider (configured: {})",
        provider.name(),
        provider.is_configured()
    );
    Ok(provider)
}
