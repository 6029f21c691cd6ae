use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::application::services::{
    StoreConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONTENT_LENGTH,
    DEFAULT_PAGE_SIZE, DEFAULT_TOP_K,
};
use crate::infrastructure::embedding::EmbeddingProviderKind;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub qdrant: QdrantConfig,
    pub store: StoreSettings,
    /// Keyed by the index name used in request paths.
    pub indexes: HashMap<String, IndexConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

/// Limits shared by every index.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub page_size: usize,
    pub default_top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_content_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub collection: String,
    pub dimension: usize,
    #[serde(default)]
    pub backend: IndexBackend,
    #[serde(default)]
    pub chunker: ChunkerKind,
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    #[default]
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkerKind {
    #[default]
    TextSplitter,
    Paragraph,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let notes = IndexConfig {
            collection: "notes".to_string(),
            dimension: 1536,
            backend: IndexBackend::Qdrant,
            chunker: ChunkerKind::TextSplitter,
            embedding: EmbeddingConfig {
                provider: EmbeddingProviderKind::OpenAi,
                model: "text-embedding-3-small".to_string(),
            },
        };

        Self {
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            qdrant: QdrantConfig::default(),
            store: StoreSettings::default(),
            indexes: HashMap::from([("notes".to_string(), notes)]),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            default_top_k: DEFAULT_TOP_K,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl StoreSettings {
    pub fn store_config(&self, dimension: usize) -> StoreConfig {
        StoreConfig::new(dimension)
            .with_page_size(self.page_size)
            .with_default_top_k(self.default_top_k)
            .with_chunking(self.chunk_size, self.chunk_overlap)
            .with_max_content_length(self.max_content_length)
    }
}

impl AppConfig {
    /// Reads `CONFIG_PATH` (or `config.yaml`), falling back to defaults when
    /// the file does not exist, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let config = if Path::new(&path).exists() {
            Self::from_yaml(&std::fs::read_to_string(&path)?)?
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Self::default()
        };

        config.with_env(|key| std::env::var(key).ok())
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Applies `SERVER_HOST`, `SERVER_PORT`, `QDRANT_URL` and
    /// `QDRANT_API_KEY`, then validates.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("SERVER_PORT is not a port: {port}")))?;
        }
        if let Some(url) = lookup("QDRANT_URL") {
            self.qdrant.url = url;
        }
        if let Some(key) = lookup("QDRANT_API_KEY") {
            self.qdrant.api_key = Some(key);
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexes.is_empty() {
            return Err(ConfigError::Invalid("no indexes configured".to_string()));
        }

        for (name, index) in &self.indexes {
            self.store
                .store_config(index.dimension)
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("index {name}: {e}")))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
server:
  port: 9000
cors:
  allowed_origins: ["app://obsidian.md"]
store:
  page_size: 50
indexes:
  notes:
    collection: notes_v2
    dimension: 1024
    embedding:
      provider: cohere
      model: embed-english-v3.0
  scratch:
    collection: scratch
    dimension: 3
    backend: memory
    chunker: paragraph
    embedding:
      provider: openai
      model: text-embedding-3-small
"#;

    #[test]
    fn test_parses_yaml_with_defaults() {
        let config = AppConfig::from_yaml(YAML).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.cors.allowed_origins, vec!["app://obsidian.md"]);
        assert_eq!(config.store.page_size, 50);
        assert_eq!(config.store.default_top_k, DEFAULT_TOP_K);

        let notes = &config.indexes["notes"];
        assert_eq!(notes.backend, IndexBackend::Qdrant);
        assert_eq!(notes.chunker, ChunkerKind::TextSplitter);
        assert_eq!(notes.embedding.provider, EmbeddingProviderKind::Cohere);

        let scratch = &config.indexes["scratch"];
        assert_eq!(scratch.backend, IndexBackend::Memory);
        assert_eq!(scratch.chunker, ChunkerKind::Paragraph);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::default()
            .with_env(|key| match key {
                "SERVER_PORT" => Some("3000".to_string()),
                "QDRANT_URL" => Some("http://qdrant:6334".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.qdrant.url, "http://qdrant:6334");
        assert!(config.qdrant.api_key.is_none());
    }

    #[test]
    fn test_rejects_bad_port() {
        let err = AppConfig::default()
            .with_env(|key| (key == "SERVER_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unusable_store_settings() {
        let mut config = AppConfig::default();
        config.store.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.store.chunk_overlap = config.store.chunk_size;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.indexes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = AppConfig::from_yaml(include_str!("../../config.example.yaml")).unwrap();

        config.validate().unwrap();
        assert_eq!(config.indexes.len(), 2);
        assert_eq!(config.indexes["scratch"].backend, IndexBackend::Memory);
    }

    #[test]
    fn test_store_config_from_settings() {
        let store = StoreSettings::default().store_config(3);

        assert_eq!(store, StoreConfig::new(3));
    }
}
