use thiserror::Error;

#[derive(Error, Debug)]
pub enum WealthRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Malformed structured output: {0}")]
    StructuredOutput(String),

    #[error("Query plan could not be parsed: {0}")]
    PlanParsing(String),

    #[error("Knowledge source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Empty conversation: at least one user turn is required")]
    EmptyConversation,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WealthRagError>;
