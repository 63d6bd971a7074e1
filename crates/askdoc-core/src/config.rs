//! Askdoc configuration management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for development. Secrets (API keys, database
//! URLs) always come from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// LLM and embedding provider configuration
    pub llm: LlmConfig,

    /// Translation service configuration
    pub translate: TranslateConfig,

    /// Conversation and retrieval configuration
    pub chat: ChatConfig,

    /// Query-history database
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if config.llm.api_key.is_none() {
                config.llm.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.llm.ollama_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }

        // Translation
        if let Ok(url) = std::env::var("TRANSLATE_URL") {
            config.translate.endpoint = Some(url);
        }
        if let Ok(key) = std::env::var("TRANSLATE_API_KEY") {
            config.translate.api_key = Some(key);
        }

        // Chat
        if let Ok(path) = std::env::var("DEFAULT_DOCUMENT") {
            config.chat.default_document = path;
        }

        // Database
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.postgres_url = Some(url);
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence for secrets)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        if env_config.server.host != ServerConfig::default().host {
            self.server.host = env_config.server.host;
        }
        if env_config.server.port != ServerConfig::default().port {
            self.server.port = env_config.server.port;
        }

        // Always use env for sensitive values
        if env_config.llm.api_key.is_some() {
            self.llm.api_key = env_config.llm.api_key;
        }
        if env_config.translate.api_key.is_some() {
            self.translate.api_key = env_config.translate.api_key;
        }
        if env_config.database.postgres_url.is_some() {
            self.database.postgres_url = env_config.database.postgres_url;
        }

        Ok(self)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes (multipart uploads)
    pub max_body_size: usize,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 25 * 1024 * 1024, // 25MB of PDFs per upload
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// LLM and embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider to use for completion and embedding
    pub provider: LlmProvider,

    /// API key (Gemini or OpenAI)
    pub api_key: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Completion model name
    pub model: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds, applied to the HTTP client so a hung
    /// upstream surfaces as an unavailable-capability error
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "gemini-1.5-flash".to_string(),
            embedding_model: "embedding-001".to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    OpenAI,
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Translation endpoint (LibreTranslate-compatible). Language
    /// normalization is disabled when unset.
    pub endpoint: Option<String>,

    /// Optional API key for the translation endpoint
    pub api_key: Option<String>,

    /// Language of the indexed content; questions in other languages are
    /// translated to this before retrieval
    pub target_lang: String,

    /// Minimum detector confidence before a question is treated as
    /// non-target-language
    pub min_confidence: f64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            target_lang: "en".to_string(),
            min_confidence: 0.5,
        }
    }
}

/// Conversation and retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of chunks retrieved per question
    pub retrieve_top_k: usize,

    /// Maximum prior turns included verbatim in each prompt. Older turns
    /// stay in the session record but are dropped from the prompt.
    pub history_window: usize,

    /// Maximum characters of retrieved context per prompt
    pub max_context_chars: usize,

    /// Chunk size in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Bundled document ingested by the default-document endpoint
    pub default_document: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            retrieve_top_k: 4,
            history_window: 6,
            max_context_chars: 8000,
            chunk_size: 1000,
            chunk_overlap: 200,
            default_document: "data/handbook.pdf".to_string(),
        }
    }
}

/// Query-history database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; history logging is disabled when unset
    pub postgres_url: Option<String>,

    /// Connection pool size
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: None,
            pool_size: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.chat.retrieve_top_k, 4);
        assert_eq!(config.chat.chunk_size, 1000);
        assert_eq!(config.chat.chunk_overlap, 200);
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert!(config.translate.endpoint.is_none());
    }

    #[test]
    fn test_llm_provider_parse() {
        assert_eq!(
            "gemini".parse::<LlmProvider>().unwrap(),
            LlmProvider::Gemini
        );
        assert_eq!(
            "OpenAI".parse::<LlmProvider>().unwrap(),
            LlmProvider::OpenAI
        );
        assert_eq!(
            "ollama".parse::<LlmProvider>().unwrap(),
            LlmProvider::Ollama
        );
        assert!("invalid".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.chat.history_window, config.chat.history_window);
    }
}
