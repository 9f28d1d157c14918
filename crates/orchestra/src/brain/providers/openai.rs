//! OpenAI-compatible provider (OpenAI, Groq, Ollama)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::provider_trait::{
    status_error, ChatMessage, ChatRequest, LLMProviderTrait, ProviderError, ProviderType,
};

/// Chat-completions provider for any OpenAI-compatible endpoint
pub struct OpenAIProvider {
    client: Client,
    provider_type: ProviderType,
    api_key: Option<String>,
    endpoint: String,
}

impl OpenAIProvider {
    /// Create a provider for one of the OpenAI-compatible backends
    pub fn new(
        provider_type: ProviderType,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if provider_type == ProviderType::Anthropic {
            return Err(ProviderError::ConfigError(
                "Anthropic is not an OpenAI-compatible provider".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ConfigError(e.to_string()))?;

        if api_key.is_some() {
            tracing::info!("{} provider initialized with API key", provider_type);
        } else if provider_type != ProviderType::Ollama {
            tracing::warn!("{} provider created without API key", provider_type);
        }

        Ok(Self {
            client,
            provider_type,
            api_key,
            endpoint: provider_type.default_endpoint().to_string(),
        })
    }

    /// Override the endpoint (e.g. local proxies or a remote Ollama host)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn message_to_openai(&self, msg: &ChatMessage) -> serde_json::Value {
        serde_json::json!({
            "role": msg.role.as_str(),
            "content": msg.content
        })
    }

    fn build_payload(&self, request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| self.message_to_openai(m))
            .collect();

        serde_json::json!({
            "model": request.config.model,
            "temperature": request.config.temperature,
            "max_tokens": request.config.max_tokens,
            "messages": messages
        })
    }

    fn parse_response(&self, json: &serde_json::Value) -> Result<String, ProviderError> {
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ProviderError::ParseError("response has no message content".to_string()))
    }
}

#[async_trait]
impl LLMProviderTrait for OpenAIProvider {
    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    fn name(&self) -> &'static str {
        match self.provider_type {
            ProviderType::Groq => "Groq",
            ProviderType::Ollama => "Ollama",
            _ => "OpenAI",
        }
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.provider_type == ProviderType::Ollama
    }

    fn default_model(&self) -> &str {
        self.provider_type.default_model()
    }

    async fn generate(&self, request: ChatRequest) -> Result<String, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::AuthError(format!(
                "No {} API key configured",
                self.name()
            )));
        }

        let payload = self.build_payload(&request);

        tracing::debug!(
            "[{}] Sending request: model={}, messages={}",
            self.name(),
            request.config.model,
            request.messages.len()
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        self.parse_response(&json)
    }
}
