pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod sources;

#[cfg(test)]
pub mod tests;

pub use config::AppConfig;
pub use errors::*;
