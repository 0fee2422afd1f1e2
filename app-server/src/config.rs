//! Server configuration.
//!
//! Read from a TOML file, then overridden by environment variables for the
//! settings that differ between deployments. Every section is optional.
//!
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1:8080"
//!
//! [openai]
//! endpoint = "https://my-resource.openai.azure.com"
//! chat_model = "gpt-4o"
//! embedding_model = "text-embedding-ada-002"
//!
//! [storage]
//! requests_dir = "data/requests"
//! documents_path = "data/maintenance_requests.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use copilot_agent::SessionConfig;
use copilot_completion::CompletionConfig;
use copilot_retrieval::RetrievalConfig;
use serde::Deserialize;

/// Environment variable overriding `openai.api_key`.
pub const ENV_API_KEY: &str = "COPILOT_OPENAI_API_KEY";

/// Environment variable overriding `openai.endpoint`.
pub const ENV_ENDPOINT: &str = "COPILOT_OPENAI_ENDPOINT";

/// Environment variable overriding `server.bind_addr`.
pub const ENV_BIND_ADDR: &str = "COPILOT_BIND_ADDR";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ListenConfig,
    pub openai: ProviderConfig,
    pub completion: CompletionSettings,
    pub sessions: SessionSettings,
    pub retrieval: RetrievalConfig,
    pub storage: StorageConfig,
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub bind_addr: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Hosted model settings.
///
/// When `endpoint` is set, requests go to that Azure OpenAI resource and the
/// model names are deployment names. Otherwise they go to `base_url`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub base_url: String,
    pub api_version: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            base_url: "https://api.openai.com/v1".to_string(),
            api_version: "2024-06-01".to_string(),
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
        }
    }
}

// Hand-written so the API key never reaches the logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

/// Completion loop limits, in TOML-friendly units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub max_rounds: u32,
    pub request_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    pub budget_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        let defaults = CompletionConfig::default();
        Self {
            max_rounds: defaults.max_rounds,
            request_timeout_secs: defaults.request_timeout.as_secs(),
            tool_timeout_secs: defaults.tool_timeout.as_secs(),
            budget_secs: defaults.budget.as_secs(),
        }
    }
}

impl CompletionSettings {
    pub fn to_config(&self) -> CompletionConfig {
        CompletionConfig::default()
            .with_max_rounds(self.max_rounds)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_tool_timeout(Duration::from_secs(self.tool_timeout_secs))
            .with_budget(Duration::from_secs(self.budget_secs))
    }
}

/// Session lifetime, in TOML-friendly units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            ttl_secs: defaults.ttl.as_secs(),
            sweep_interval_secs: defaults.sweep_interval.as_secs(),
        }
    }
}

impl SessionSettings {
    pub fn to_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_ttl(Duration::from_secs(self.ttl_secs))
            .with_sweep_interval(Duration::from_secs(self.sweep_interval_secs.max(1)))
    }
}

/// On-disk locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory the save tool writes requests to.
    pub requests_dir: PathBuf,

    /// JSON file of pre-embedded requests for vector search. Search runs
    /// over an empty store when unset.
    pub documents_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            requests_dir: PathBuf::from("data/requests"),
            documents_path: None,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }

    /// Read the TOML file at `path`, or use defaults when `path` is `None`,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("in config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override settings from environment variables looked up via `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.openai.api_key = Some(key);
        }
        if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
            self.openai.endpoint = Some(endpoint);
        }
        if let Some(addr) = non_empty(ENV_BIND_ADDR) {
            self.server.bind_addr = addr;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(ServerConfig::from_toml("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = ServerConfig::from_toml(
            r#"
            [completion]
            max_rounds = 2

            [retrieval]
            default_min_score = 0.5

            [storage]
            documents_path = "docs.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.completion.to_config().max_rounds, 2);
        assert_eq!(
            config.completion.to_config().budget,
            CompletionConfig::default().budget
        );
        assert_eq!(config.retrieval.default_min_score, 0.5);
        assert_eq!(config.storage.documents_path, Some(PathBuf::from("docs.json")));
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config =
            ServerConfig::from_toml("[openai]\napi_key = \"from-file\"\n").unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, "from-env"),
            (ENV_ENDPOINT, "https://example.openai.azure.com"),
            (ENV_BIND_ADDR, ""),
        ]);

        config.apply_env_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.openai.api_key.as_deref(), Some("from-env"));
        assert_eq!(
            config.openai.endpoint.as_deref(),
            Some("https://example.openai.azure.com")
        );
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = ServerConfig::default();
        config.openai.api_key = Some("sk-secret".to_string());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("copilot.toml");
        std::fs::write(&path, "[sessions]\nttl_secs = 90\n").unwrap();

        let config = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.sessions.to_config().ttl, Duration::from_secs(90));

        assert!(ServerConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        assert!(ServerConfig::from_toml("[completion]\nmax_rounds = \"many\"\n").is_err());
    }
}
