//! Multi-source context retrieval
//!
//! Executes a plan against the three knowledge sources. The three source
//! categories run concurrently and the retriever waits for all of them to
//! settle; any single source coming back empty (or failing) is a degraded
//! outcome, never a request failure.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use tracing::debug;
use tracing::warn;

use super::ContextBundle;
use super::Conversation;
use super::Plan;
use crate::config::RetrievalConfig;
use crate::errors::Result;
use crate::llm::prompts;
use crate::llm::CompletionRequest;
use crate::llm::LlmService;
use crate::sources::EncyclopedicSource;
use crate::sources::EvidenceItem;
use crate::sources::SemanticSource;
use crate::sources::WebSearchSource;

/// Structured contract for entity extraction calls
#[derive(Debug, Deserialize)]
struct EntityList {
    #[serde(default)]
    entities: Vec<String>,
}

/// Retriever stage: rewrite, extract, fan out, merge
pub struct ContextRetriever {
    semantic: Arc<dyn SemanticSource>,
    encyclopedic: Arc<dyn EncyclopedicSource>,
    web: Arc<dyn WebSearchSource>,
    llm: LlmService,
    config: RetrievalConfig,
}

impl ContextRetriever {
    pub fn new(
        semantic: Arc<dyn SemanticSource>,
        encyclopedic: Arc<dyn EncyclopedicSource>,
        web: Arc<dyn WebSearchSource>,
        llm: LlmService,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            semantic,
            encyclopedic,
            web,
            llm,
            config,
        }
    }

    /// Execute the plan and assemble the context bundle
    pub async fn retrieve(
        &self,
        plan: &Plan,
        conversation: &Conversation<'_>,
    ) -> Result<ContextBundle> {
        // Step 1: standalone retrieval query (skipped on the first turn)
        let rewritten = if conversation.is_first_turn() {
            plan.user_query.clone()
        } else {
            self.rewrite_query(conversation).await
        };
        debug!("Rewritten retrieval query: {}", rewritten);

        // Step 2: entities in the query broaden the semantic search
        let entities = self.extract_entities(&rewritten).await;

        // Step 3: entities already discussed become the exclusion set
        let excluded = self.extract_history_entities(conversation).await;
        if !excluded.is_empty() {
            debug!("Excluding already-discussed entities: {:?}", excluded);
        }

        // Steps 4-7: the three source categories fan out concurrently
        let (semantic, encyclopedic, web) = futures::join!(
            self.query_semantic(plan, &rewritten, &entities, &excluded),
            self.query_encyclopedic(&entities),
            self.query_web(&rewritten),
        );

        debug!(
            "Retrieved {} semantic, {} encyclopedic, {} web results",
            semantic.len(),
            encyclopedic.len(),
            web.len()
        );

        Ok(ContextBundle {
            semantic,
            encyclopedic,
            web,
            rewritten_query: rewritten,
            entities,
        })
    }

    /// Rewrite the latest message into a standalone query
    ///
    /// Falls back to the plan's user query when the rewrite call fails; a
    /// degraded query is better than a failed request.
    async fn rewrite_query(&self, conversation: &Conversation<'_>) -> String {
        let history = conversation.render_history(self.config.history_window);
        let request = CompletionRequest::new(
            prompts::REWRITE_SYSTEM,
            prompts::build_rewrite_prompt(&history, conversation.latest_message()),
        );

        match self.llm.complete_text(request).await {
            Ok(rewritten) if !rewritten.trim().is_empty() => rewritten.trim().to_string(),
            Ok(_) => conversation.latest_message().to_string(),
            Err(e) => {
                warn!("Query rewrite failed, using original message: {}", e);
                conversation.latest_message().to_string()
            }
        }
    }

    /// Extract named entities from the rewritten query (non-fatal)
    async fn extract_entities(&self, text: &str) -> Vec<String> {
        let request = CompletionRequest::new(
            prompts::EXTRACTION_SYSTEM,
            prompts::build_entity_extraction_prompt(text),
        );

        match self.llm.complete_structured::<EntityList>(request).await {
            Ok(list) => normalize_entities(list.entities),
            Err(e) => {
                warn!("Query entity extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Extract entities already discussed in history (non-fatal exclusion set)
    async fn extract_history_entities(&self, conversation: &Conversation<'_>) -> Vec<String> {
        if conversation.is_first_turn() {
            return Vec::new();
        }

        let history = conversation.render_history(self.config.history_window);
        let request = CompletionRequest::new(
            prompts::EXTRACTION_SYSTEM,
            prompts::build_history_entity_prompt(&history),
        );

        match self.llm.complete_structured::<EntityList>(request).await {
            Ok(list) => normalize_entities(list.entities),
            Err(e) => {
                // On error the exclusion set is empty and retrieval proceeds
                warn!("History entity extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Fan out one semantic query per embedding, merge keeping best scores
    async fn query_semantic(
        &self,
        plan: &Plan,
        rewritten: &str,
        entities: &[String],
        excluded: &[String],
    ) -> Vec<EvidenceItem> {
        let mut queries: Vec<(String, f32)> = Vec::new();
        queries.push((rewritten.to_string(), self.config.similarity_threshold));
        for query in &plan.search_queries {
            if query != rewritten {
                queries.push((query.clone(), self.config.similarity_threshold));
            }
        }
        // Entity sub-queries are narrower, so they get the stricter floor
        for entity in entities {
            queries.push((entity.clone(), self.config.entity_query_threshold));
        }

        let futures = queries.iter().map(|(query, min_score)| {
            self.semantic
                .query(query, self.config.semantic_top_k, *min_score, excluded)
        });

        let mut all = Vec::new();
        for result in join_all(futures).await {
            match result {
                Ok(items) => all.extend(items),
                Err(e) => warn!("Semantic query failed: {}", e),
            }
        }

        merge_semantic_matches(all, self.config.semantic_top_k)
    }

    /// One encyclopedic lookup per entity, independent success/failure
    async fn query_encyclopedic(&self, entities: &[String]) -> Vec<EvidenceItem> {
        let futures = entities.iter().map(|entity| self.encyclopedic.summarize(entity));

        let mut items = Vec::new();
        for (entity, result) in entities.iter().zip(join_all(futures).await) {
            match result {
                Ok(Some(item)) => items.push(item),
                Ok(None) => debug!("No validated summary for '{}'", entity),
                Err(e) => warn!("Encyclopedic lookup failed for '{}': {}", entity, e),
            }
        }
        items
    }

    /// One web search with the rewritten query; failure yields an empty list
    async fn query_web(&self, rewritten: &str) -> Vec<EvidenceItem> {
        match self.web.search(rewritten).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Web search failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Trim, drop empties and deduplicate entity names preserving order
fn normalize_entities(entities: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for entity in entities {
        let trimmed = entity.trim().to_string();
        if trimmed.is_empty() {
            continue;
        }
        if !seen
            .iter()
            .any(|s: &String| s.eq_ignore_ascii_case(&trimmed))
        {
            seen.push(trimmed);
        }
    }
    seen
}

/// Merge semantic matches from multiple queries
///
/// Duplicate IDs keep the highest score seen; results are ordered by
/// descending score and capped.
#[must_use]
pub fn merge_semantic_matches(items: Vec<EvidenceItem>, cap: usize) -> Vec<EvidenceItem> {
    let mut best: HashMap<String, EvidenceItem> = HashMap::new();
    for item in items {
        match best.get(&item.id) {
            Some(existing) if existing.score >= item.score => {}
            _ => {
                best.insert(item.id.clone(), item);
            }
        }
    }

    let mut merged: Vec<EvidenceItem> = best.into_values().collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(cap);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceKind;

    fn item(id: &str, score: f32) -> EvidenceItem {
        EvidenceItem {
            id: id.to_string(),
            source: SourceKind::Semantic,
            score,
            tier: None,
            title: format!("Title {id}"),
            body: String::new(),
            link: None,
        }
    }

    #[test]
    fn test_merge_keeps_max_score_per_id() {
        let merged = merge_semantic_matches(
            vec![item("a", 0.5), item("a", 0.9), item("a", 0.7)],
            5,
        );
        assert_eq!(merged.len(), 1);
        assert!((merged[0].score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge_sorts_descending_and_caps() {
        let merged = merge_semantic_matches(
            vec![
                item("a", 0.4),
                item("b", 0.9),
                item("c", 0.6),
                item("d", 0.8),
                item("e", 0.5),
                item("f", 0.7),
            ],
            5,
        );
        assert_eq!(merged.len(), 5);
        let scores: Vec<f32> = merged.iter().map(|i| i.score).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        // The lowest score (0.4) fell off the cap
        assert!(!merged.iter().any(|i| i.id == "a"));
    }

    #[test]
    fn test_normalize_entities_dedups_case_insensitive() {
        let normalized = normalize_entities(vec![
            "Jane Doe".to_string(),
            " jane doe ".to_string(),
            String::new(),
            "Acme Corp".to_string(),
        ]);
        assert_eq!(normalized, vec!["Jane Doe", "Acme Corp"]);
    }
}
