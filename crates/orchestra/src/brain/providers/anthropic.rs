//! Anthropic Claude provider implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::provider_trait::{
    status_error, ChatMessage, ChatRequest, LLMProviderTrait, MessageRole, ProviderError,
    ProviderType,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ConfigError(e.to_string()))?;

        if api_key.is_some() {
            tracing::info!("Anthropic provider initialized with API key");
        } else {
            tracing::warn!("Anthropic provider created without API key");
        }

        Ok(Self {
            client,
            api_key,
            endpoint: ProviderType::Anthropic.default_endpoint().to_string(),
        })
    }

    /// Create with a custom endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Anthropic takes the system prompt as a separate parameter
    fn messages_to_anthropic(
        &self,
        messages: &[ChatMessage],
    ) -> (Option<String>, Vec<serde_json::Value>) {
        let mut system_prompt: Option<String> = None;
        let mut api_messages = Vec::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => match system_prompt {
                    Some(ref mut s) => {
                        s.push_str("\n\n");
                        s.push_str(&msg.content);
                    }
                    None => system_prompt = Some(msg.content.clone()),
                },
                MessageRole::User | MessageRole::Assistant => {
                    api_messages.push(serde_json::json!({
                        "role": msg.role.as_str(),
                        "content": msg.content
                    }));
                }
            }
        }

        (system_prompt, api_messages)
    }

    fn parse_response(&self, json: &serde_json::Value) -> Result<String, ProviderError> {
        let blocks = json["content"]
            .as_array()
            .ok_or_else(|| ProviderError::ParseError("response has no content blocks".to_string()))?;

        let text: String = blocks
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl LLMProviderTrait for AnthropicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn name(&self) -> &'static str {
        "Anthropic"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn default_model(&self) -> &str {
        ProviderType::Anthropic.default_model()
    }

    async fn generate(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::AuthError("No Anthropic API key configured".to_string()))?;

        let (system_prompt, messages) = self.messages_to_anthropic(&request.messages);
        if messages.is_empty() {
            return Err(ProviderError::ConfigError(
                "At least one non-system message is required".to_string(),
            ));
        }

        let mut payload = serde_json::json!({
            "model": request.config.model,
            "max_tokens": request.config.max_tokens,
            "temperature": request.config.temperature,
            "messages": messages
        });
        if let Some(system) = system_prompt {
            payload["system"] = serde_json::json!(system);
        }

        tracing::debug!(
            "[Anthropic] Sending request: model={}, messages={}",
            request.config.model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
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
