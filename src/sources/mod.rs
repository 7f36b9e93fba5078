//! Knowledge sources adapter
//!
//! Uniform read interface over the three heterogeneous evidence providers:
//! - Semantic: nearest-neighbor search over the vector index
//! - Encyclopedic: summary lookup for a named entity
//! - Web search: general web results for a query
//!
//! Each source returns [`EvidenceItem`]s in a common shape; per-source
//! failures are the retriever's concern and are never fatal.

pub mod encyclopedic;
pub mod semantic;
pub mod websearch;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde::Serialize;

pub use encyclopedic::HttpEncyclopedicSource;
pub use semantic::HttpSemanticSource;
pub use websearch::HttpWebSearchSource;

use crate::errors::Result;

/// Kind of knowledge source an evidence item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Vector similarity search over the internal knowledge base
    Semantic,
    /// Encyclopedic summary lookup
    Encyclopedic,
    /// General web search
    WebSearch,
}

impl SourceKind {
    /// Inline tag the synthesizer uses for claims from this source
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Semantic => "[KB]",
            Self::Encyclopedic => "[WIKI]",
            Self::WebSearch => "[WEB]",
        }
    }
}

/// Qualitative quality tier for encyclopedic evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

/// A normalized unit of retrieved context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Stable identity within the source, used for deduplication
    pub id: String,
    pub source: SourceKind,
    /// Relevance/similarity score in [0, 1]
    pub score: f32,
    /// Quality tier (encyclopedic evidence only)
    pub tier: Option<QualityTier>,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

impl EvidenceItem {
    /// Combined text used for entity extraction and grounding checks
    #[must_use]
    pub fn text(&self) -> String {
        format!("{}. {}", self.title, self.body)
    }
}

/// Semantic/vector retrieval source
pub trait SemanticSource: Send + Sync {
    /// Query the vector index with a text query
    ///
    /// Items scoring below `min_score` and items tagged with an entity in
    /// `exclude_entities` must not be returned.
    fn query<'a>(
        &'a self,
        query: &'a str,
        top_k: usize,
        min_score: f32,
        exclude_entities: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<EvidenceItem>>>;
}

/// Encyclopedic summary lookup source
pub trait EncyclopedicSource: Send + Sync {
    /// Look up a summary for an entity name
    ///
    /// `None` means the lookup succeeded but the content failed the
    /// quality validator (or the entity has no entry).
    fn summarize<'a>(&'a self, term: &'a str) -> BoxFuture<'a, Result<Option<EvidenceItem>>>;
}

/// General web search source
pub trait WebSearchSource: Send + Sync {
    /// Search the web for a query
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<EvidenceItem>>>;
}
