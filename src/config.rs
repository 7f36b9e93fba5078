use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_llm_model() -> String {
    "gemma3:27b".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> usize {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    pub dimension: usize,
    pub model: String,
    /// Endpoint for the embedding API; defaults to the LLM endpoint when empty
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Vector index query endpoint (semantic source)
    pub semantic_endpoint: String,
    /// Encyclopedic summary lookup endpoint
    pub encyclopedic_endpoint: String,
    /// General web search endpoint
    pub websearch_endpoint: String,
    /// API key for the web search provider, if required
    #[serde(default)]
    pub websearch_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum similarity for semantic matches on the main rewritten query
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Stricter floor for entity-specific sub-queries
    #[serde(default = "default_entity_query_threshold")]
    pub entity_query_threshold: f32,
    /// Maximum semantic matches retained in a context bundle
    #[serde(default = "default_semantic_top_k")]
    pub semantic_top_k: usize,
    /// Prior conversation turns considered for rewriting and exclusion
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Per-request budget; on expiry the pipeline returns the safe fallback
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_similarity_threshold() -> f32 {
    0.38
}

fn default_entity_query_threshold() -> f32 {
    0.45
}

fn default_semantic_top_k() -> usize {
    5
}

fn default_history_window() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            entity_query_threshold: default_entity_query_threshold(),
            semantic_top_k: default_semantic_top_k(),
            history_window: default_history_window(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub embeddings: EmbeddingsConfig,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            println!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::WealthRagError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.endpoint
    }

    /// Get LLM key
    pub fn llm_key(&self) -> &str {
        &self.llm.api_key
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.model
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get embedding endpoint, falling back to the LLM endpoint
    pub fn embedding_endpoint(&self) -> &str {
        if self.embeddings.endpoint.is_empty() {
            &self.llm.endpoint
        } else {
            &self.embeddings.endpoint
        }
    }

    /// Get minimum semantic similarity for the main query
    pub fn similarity_threshold(&self) -> f32 {
        self.retrieval.similarity_threshold
    }

    /// Get semantic result cap
    pub fn semantic_top_k(&self) -> usize {
        self.retrieval.semantic_top_k
    }

    /// Get the per-request timeout budget in seconds
    pub fn request_timeout_secs(&self) -> u64 {
        self.retrieval.request_timeout_secs
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            llm: LlmConfig {
                endpoint: "http://localhost:11434".to_string(),
                api_key: "ollama".to_string(),
                model: "gemma3:27b".to_string(),
                temperature: default_temperature(),
                max_tokens: default_max_tokens(),
            },
            embeddings: EmbeddingsConfig {
                dimension: 1536,
                model: "text-embedding-ada-002".to_string(),
                endpoint: String::new(),
            },
            sources: SourcesConfig {
                semantic_endpoint: "http://localhost:6333".to_string(),
                encyclopedic_endpoint: "https://en.wikipedia.org/api/rest_v1".to_string(),
                websearch_endpoint: "https://serpapi.example.com/search".to_string(),
                websearch_api_key: None,
            },
            retrieval: RetrievalConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_retrieval_thresholds() {
        let config = AppConfig::default();
        assert!((config.similarity_threshold() - 0.38).abs() < f32::EPSILON);
        assert!((config.retrieval.entity_query_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.semantic_top_k(), 5);
        assert_eq!(config.retrieval.history_window, 4);
    }

    #[test]
    fn test_from_file_roundtrip() {
        let config = AppConfig::default();
        let toml_text = toml::to_string(&config).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_text.as_bytes()).unwrap();

        let loaded = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.llm_model(), config.llm_model());
        assert_eq!(loaded.embedding_dimension(), config.embedding_dimension());
    }

    #[test]
    fn test_retrieval_section_optional() {
        let toml_text = r#"
[logging]
level = "debug"
backtrace = false

[llm]
endpoint = "http://localhost:11434"
api_key = "ollama"

[embeddings]
dimension = 768
model = "nomic-embed-text"

[sources]
semantic_endpoint = "http://localhost:6333"
encyclopedic_endpoint = "http://localhost:8000"
websearch_endpoint = "http://localhost:8001"
"#;
        let config: AppConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.semantic_top_k(), 5);
        assert_eq!(config.embedding_dimension(), 768);
        // Embedding endpoint falls back to the LLM endpoint
        assert_eq!(config.embedding_endpoint(), "http://localhost:11434");
    }
}
