//! Embedding providers.
//!
//! Hosted embedding models reachable through the OpenAI embeddings API,
//! either on api.openai.com or on an Azure OpenAI deployment.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,

    /// Model to use (provider-specific).
    pub model: Option<String>,

    /// Dimensions for the output (if supported by provider).
    pub dimensions: Option<usize>,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            dimensions: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Dimension of the embedding.
    pub dimension: usize,

    /// Token usage (if available).
    pub tokens_used: Option<u64>,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Get the default embedding dimension.
    fn default_dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// An Azure OpenAI deployment addressed by name and API version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureDeployment {
    /// Deployment name, e.g. `text-embedding-ada-002`.
    pub deployment: String,

    /// Value of the `api-version` query parameter.
    pub api_version: String,
}

/// OpenAI embedding provider.
pub struct OpenAIProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,

    /// Azure deployment, when talking to Azure OpenAI instead of OpenAI.
    azure: Option<AzureDeployment>,

    /// Upper bound for a single request.
    timeout: Duration,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            default_model: "text-embedding-ada-002".to_string(),
            azure: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Target an Azure OpenAI deployment. The base URL becomes the resource
    /// endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub fn with_azure_deployment(mut self, deployment: AzureDeployment) -> Self {
        self.default_model = deployment.deployment.clone();
        self.azure = Some(deployment);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn embeddings_url(&self) -> String {
        match &self.azure {
            Some(azure) => format!(
                "{}/openai/deployments/{}/embeddings?api-version={}",
                self.base_url, azure.deployment, azure.api_version
            ),
            None => format!("{}/embeddings", self.base_url),
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            EmbeddingError::Http(err)
        }
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        if self.azure.is_some() {
            "azure-openai"
        } else {
            "openai"
        }
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn default_dimension(&self) -> usize {
        match self.default_model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => crate::DEFAULT_DIMENSION,
        }
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        let model = request.model.unwrap_or_else(|| self.default_model.clone());

        debug!("Generating embedding with model: {model}");

        let mut body = serde_json::json!({
            "input": request.text,
            "model": model
        });

        if let Some(dims) = request.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }

        let builder = self
            .client
            .post(self.embeddings_url())
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(&body);
        let builder = if self.azure.is_some() {
            builder.header("api-key", api_key)
        } else {
            builder.header("Authorization", format!("Bearer {api_key}"))
        };

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let result: OpenAIEmbeddingResponse =
            response.json().await.map_err(|e| self.map_send_error(e))?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))?
            .embedding;

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "Provider returned an empty embedding".to_string(),
            ));
        }

        let dimension = embedding.len();
        let tokens_used = result.usage.map(|u| u.total_tokens);

        info!("Generated embedding with {dimension} dimensions");

        Ok(EmbeddingResponse {
            embedding,
            model: result.model,
            dimension,
            tokens_used,
        })
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
    model: String,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedding_body(vector: &[f32]) -> serde_json::Value {
        serde_json::json!({
            "data": [{ "embedding": vector, "index": 0 }],
            "model": "text-embedding-ada-002",
            "usage": { "prompt_tokens": 4, "total_tokens": 4 }
        })
    }

    #[test]
    fn test_embedding_request() {
        let request = EmbeddingRequest::new("Hello world")
            .with_model("text-embedding-3-small")
            .with_dimensions(512);

        assert_eq!(request.text, "Hello world");
        assert_eq!(request.model, Some("text-embedding-3-small".to_string()));
        assert_eq!(request.dimensions, Some(512));
    }

    #[test]
    fn test_openai_provider_default_dimensions() {
        let provider = OpenAIProvider::new().with_model("text-embedding-3-large");
        assert_eq!(provider.default_dimension(), 3072);
    }

    #[tokio::test]
    async fn test_openai_embed_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(embedding_body(&[0.1, 0.2, 0.3])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new()
            .with_api_key("sk-test")
            .with_base_url(server.uri());

        let response = provider
            .embed(EmbeddingRequest::new("leaking faucet"))
            .await
            .unwrap();

        assert_eq!(response.embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(response.dimension, 3);
        assert_eq!(response.tokens_used, Some(4));
    }

    #[tokio::test]
    async fn test_azure_embed_uses_deployment_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/embed-ada/embeddings"))
            .and(query_param("api-version", "2024-06-01"))
            .and(header("api-key", "azure-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[1.0, 0.0])))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new()
            .with_api_key("azure-key")
            .with_base_url(server.uri())
            .with_azure_deployment(AzureDeployment {
                deployment: "embed-ada".to_string(),
                api_version: "2024-06-01".to_string(),
            });

        assert_eq!(provider.name(), "azure-openai");
        let response = provider.embed(EmbeddingRequest::new("broken AC")).await.unwrap();
        assert_eq!(response.embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new()
            .with_api_key("sk-test")
            .with_base_url(server.uri());

        let err = provider.embed(EmbeddingRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::RateLimited { retry_after_secs: 7 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_api_error_carries_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new()
            .with_api_key("sk-bad")
            .with_base_url(server.uri());

        let err = provider.embed(EmbeddingRequest::new("x")).await.unwrap_err();
        assert!(err.to_string().contains("invalid api key"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_embedding_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[])))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new()
            .with_api_key("sk-test")
            .with_base_url(server.uri());

        let err = provider.embed(EmbeddingRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(embedding_body(&[0.5]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new()
            .with_api_key("sk-test")
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(50));

        let err = provider.embed(EmbeddingRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Timeout { after_ms: 50 }));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let provider = OpenAIProvider {
            api_key: None,
            ..OpenAIProvider::new()
        };
        let err = provider.embed(EmbeddingRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ProviderNotConfigured));
        assert!(!provider.is_available());
    }
}
