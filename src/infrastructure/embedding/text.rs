use async_trait::async_trait;
use rig::client::EmbeddingsClient;
use rig::embeddings::EmbeddingModel as _;
use rig::providers::{cohere, gemini, openai};
use serde::{Deserialize, Serialize};

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

/// Embedding backends an index can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    OpenAi,
    Cohere,
    Gemini,
}

impl EmbeddingProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Cohere => "cohere",
            Self::Gemini => "gemini",
        }
    }

    /// Environment variable holding the provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Cohere => "COHERE_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

enum Model {
    OpenAi(openai::EmbeddingModel),
    Cohere(cohere::EmbeddingModel),
    Gemini(gemini::embedding::EmbeddingModel),
}

pub struct TextEmbedding {
    provider: EmbeddingProviderKind,
    model_name: String,
    model: Model,
    dimension: usize,
}

impl TextEmbedding {
    /// Builds the model named by `config`, reading the API key from the
    /// provider's environment variable.
    pub fn connect(config: &EmbeddingConfig, dimension: usize) -> Result<Self, DomainError> {
        let provider = config.provider;
        let api_key = std::env::var(provider.api_key_var()).map_err(|_| {
            DomainError::external(format!("{} is not set", provider.api_key_var()))
        })?;
        let client_error = |e: String| DomainError::external(format!("{}: {e}", provider.as_str()));

        let model = match provider {
            EmbeddingProviderKind::OpenAi => {
                let client = openai::Client::new(&api_key).map_err(|e| client_error(e.to_string()))?;
                Model::OpenAi(client.embedding_model_with_ndims(&config.model, dimension))
            }
            EmbeddingProviderKind::Cohere => {
                let client = cohere::Client::new(&api_key).map_err(|e| client_error(e.to_string()))?;
                Model::Cohere(client.embedding_model_with_ndims(
                    &config.model,
                    "search_document",
                    dimension,
                ))
            }
            EmbeddingProviderKind::Gemini => {
                let client = gemini::Client::new(&api_key).map_err(|e| client_error(e.to_string()))?;
                Model::Gemini(client.embedding_model_with_ndims(&config.model, dimension))
            }
        };

        tracing::info!(
            provider = provider.as_str(),
            model = %config.model,
            dimension,
            "Embedding model ready"
        );

        Ok(Self {
            provider,
            model_name: config.model.clone(),
            model,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let embedding = match &self.model {
            Model::OpenAi(model) => model.embed_text(text).await,
            Model::Cohere(model) => model.embed_text(text).await,
            Model::Gemini(model) => model.embed_text(text).await,
        }
        .map_err(|e| {
            DomainError::embedding(format!(
                "{}/{}: {e}",
                self.provider.as_str(),
                self.model_name
            ))
        })?;

        Ok(Embedding::from(embedding.vec))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
