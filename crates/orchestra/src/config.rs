//! Environment-driven configuration

use serde::{Deserialize, Serialize};

use crate::{brain::ProviderType, OrchestraError, Result};

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
pub const DEFAULT_STORE_URL: &str = "sqlite://orchestra_memory.sqlite";
/// `MEMORY_STORE_URL` value selecting the in-process store
pub const IN_MEMORY_STORE: &str = "memory";

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    2048
}

/// Reasoning service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: ProviderType,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Which embedder backs the memory subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline feature-hashing embedder
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAI,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hashing" | "local" => Ok(EmbeddingProvider::Hashing),
            "openai" => Ok(EmbeddingProvider::OpenAI),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    /// `sqlite://...` or `memory`
    pub store_url: String,
    pub top_k: usize,
}

impl MemorySettings {
    pub fn is_in_memory(&self) -> bool {
        self.store_url == IN_MEMORY_STORE
    }
}

/// Full runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestraConfig {
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub memory: MemorySettings,
    pub host: String,
    pub port: u16,
}

impl Default for OrchestraConfig {
    fn default() -> Self {
        let provider = ProviderType::default();
        Self {
            llm: LlmSettings {
                provider,
                model: provider.default_model().to_string(),
                endpoint: None,
                api_key: None,
                timeout_secs: default_timeout_secs(),
                max_tokens: default_max_tokens(),
            },
            embedding: EmbeddingSettings {
                provider: EmbeddingProvider::Hashing,
                model: "text-embedding-3-small".to_string(),
                dimension: DEFAULT_EMBEDDING_DIMENSION,
                endpoint: None,
                api_key: None,
            },
            memory: MemorySettings {
                store_url: DEFAULT_STORE_URL.to_string(),
                top_k: DEFAULT_TOP_K,
            },
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl OrchestraConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let provider: ProviderType = match get("LLM_PROVIDER") {
            Some(raw) => raw.parse().map_err(OrchestraError::Config)?,
            None => ProviderType::default(),
        };

        let api_key = get("LLM_API_KEY")
            .or_else(|| provider.api_key_var().and_then(|var| get(var)));

        let llm = LlmSettings {
            provider,
            model: get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            endpoint: get("LLM_ENDPOINT"),
            api_key,
            timeout_secs: parse_var(&get, "LLM_TIMEOUT_SECS", default_timeout_secs())?,
            max_tokens: parse_var(&get, "LLM_MAX_TOKENS", default_max_tokens())?,
        };

        let embedding_provider: EmbeddingProvider = match get("EMBEDDING_PROVIDER") {
            Some(raw) => raw.parse().map_err(OrchestraError::Config)?,
            None => EmbeddingProvider::Hashing,
        };

        let embedding = EmbeddingSettings {
            provider: embedding_provider,
            model: get("EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-small".to_string()),
            dimension: parse_var(&get, "EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            endpoint: get("EMBEDDING_ENDPOINT"),
            api_key: get("EMBEDDING_API_KEY").or_else(|| get("OPENAI_API_KEY")),
        };
        if embedding.dimension == 0 {
            return Err(OrchestraError::Config(
                "EMBEDDING_DIMENSION must be greater than zero".to_string(),
            ));
        }

        let memory = MemorySettings {
            store_url: get("MEMORY_STORE_URL").unwrap_or_else(|| DEFAULT_STORE_URL.to_string()),
            top_k: parse_var(&get, "MEMORY_TOP_K", DEFAULT_TOP_K)?,
        };

        Ok(Self {
            llm,
            embedding,
            memory,
            host: get("ORCHESTRA_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&get, "ORCHESTRA_PORT", 8000)?,
        })
    }

    /// Config with an in-process store and the offline embedder
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.memory.store_url = IN_MEMORY_STORE.to_string();
        config.embedding.provider = EmbeddingProvider::Hashing;
        config
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| OrchestraError::Config(format!("invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}
