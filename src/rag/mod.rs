//! RAG (Retrieval-Augmented Generation) orchestration pipeline
//!
//! This module provides the end-to-end grounded question answering pipeline:
//! - Query planning from the conversation
//! - Multi-source context retrieval with entity exclusion
//! - Context quality assessment and cross-source validation
//! - Cited answer synthesis strictly from assembled context
//! - Groundedness verification before anything reaches the caller
//!
//! # Examples
//!
//! ```rust,no_run
//! use wealthrag::config::AppConfig;
//! use wealthrag::rag::{ChatTurn, RagPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let pipeline = RagPipeline::from_config(&config)?;
//!
//!     let turns = vec![ChatTurn::user("Which founders recently sold a company?")];
//!     let response = pipeline.process_chat_request(&turns).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod pipeline;
pub mod planner;
pub mod quality;
pub mod retriever;
pub mod synthesizer;
pub mod verifier;

use serde::Deserialize;
use serde::Serialize;

pub use pipeline::ChatResponse;
pub use pipeline::PipelineStage;
pub use pipeline::RagPipeline;
pub use pipeline::FALLBACK_SENTENCE;
pub use planner::QueryPlanner;
pub use quality::ContextQualityAssessor;
pub use quality::QualityAssessment;
pub use quality::ReliabilityLevel;
pub use retriever::ContextRetriever;
pub use synthesizer::AnswerSynthesizer;
pub use verifier::GroundednessVerifier;
pub use verifier::VerificationResult;

use crate::sources::EvidenceItem;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of the conversation being answered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Read-only view over the conversation turns of one request
#[derive(Debug, Clone)]
pub struct Conversation<'a> {
    turns: &'a [ChatTurn],
}

impl<'a> Conversation<'a> {
    /// Wrap a non-empty turn list
    pub fn new(turns: &'a [ChatTurn]) -> crate::Result<Self> {
        if turns.is_empty() {
            return Err(crate::WealthRagError::EmptyConversation);
        }
        Ok(Self { turns })
    }

    /// The message being answered (content of the last turn)
    #[must_use]
    pub fn latest_message(&self) -> &str {
        &self.turns[self.turns.len() - 1].content
    }

    /// Whether this is the first turn of the conversation
    #[must_use]
    pub fn is_first_turn(&self) -> bool {
        self.turns.len() == 1
    }

    /// Up to `window` turns preceding the latest one
    #[must_use]
    pub fn history(&self, window: usize) -> &[ChatTurn] {
        let end = self.turns.len() - 1;
        let start = end.saturating_sub(window);
        &self.turns[start..end]
    }

    /// Render history turns as "role: content" lines for prompts
    #[must_use]
    pub fn render_history(&self, window: usize) -> String {
        let history = self.history(window);
        if history.is_empty() {
            return "(no prior conversation)".to_string();
        }
        history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Assistant => "assistant",
                };
                format!("{role}: {}", turn.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Structured output of the query planner
///
/// Created once per request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// The user's question restated as a standalone query
    pub user_query: String,
    /// Free-text reasoning about what must be researched
    pub reasoning: String,
    /// Ordered imperative steps the synthesizer must follow
    pub plan: Vec<String>,
    /// 1-3 self-contained research queries
    pub search_queries: Vec<String>,
}

/// Multi-source evidence assembled for one request
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    /// Semantic matches: deduplicated, descending score, capped
    pub semantic: Vec<EvidenceItem>,
    /// Validated encyclopedic summaries
    pub encyclopedic: Vec<EvidenceItem>,
    /// Web search results
    pub web: Vec<EvidenceItem>,
    /// The rewritten/optimized retrieval query
    pub rewritten_query: String,
    /// Entities extracted from the rewritten query
    pub entities: Vec<String>,
}

impl ContextBundle {
    /// Whether every source came back empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.semantic.is_empty() && self.encyclopedic.is_empty() && self.web.is_empty()
    }

    /// All evidence text concatenated, for grounding checks
    #[must_use]
    pub fn all_text(&self) -> String {
        self.semantic
            .iter()
            .chain(self.encyclopedic.iter())
            .chain(self.web.iter())
            .map(EvidenceItem::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_rejects_empty() {
        assert!(Conversation::new(&[]).is_err());
    }

    #[test]
    fn test_history_window() {
        let turns = vec![
            ChatTurn::user("a"),
            ChatTurn::assistant("b"),
            ChatTurn::user("c"),
            ChatTurn::assistant("d"),
            ChatTurn::user("e"),
        ];
        let conversation = Conversation::new(&turns).unwrap();
        assert_eq!(conversation.latest_message(), "e");

        let history = conversation.history(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "c");
        assert_eq!(history[1].content, "d");
    }

    #[test]
    fn test_render_history_first_turn() {
        let turns = vec![ChatTurn::user("hello")];
        let conversation = Conversation::new(&turns).unwrap();
        assert!(conversation.is_first_turn());
        assert_eq!(conversation.render_history(4), "(no prior conversation)");
    }
}
