//! Scripted backends and sources for scenario tests

use std::sync::Mutex;

use futures::future::BoxFuture;

use crate::errors::Result;
use crate::llm::prompts;
use crate::llm::CompletionBackend;
use crate::llm::CompletionRequest;
use crate::llm::StreamingResponse;
use crate::sources::EncyclopedicSource;
use crate::sources::EvidenceItem;
use crate::sources::SemanticSource;
use crate::sources::SourceKind;
use crate::sources::WebSearchSource;

/// Completion backend scripted per pipeline stage
///
/// Routes on the system prompt of each request and records every request so
/// tests can assert on the exact prompts the stages assembled.
pub struct ScriptedLlm {
    pub plan_json: String,
    pub rewrite: String,
    pub query_entities_json: String,
    pub history_entities_json: String,
    pub draft: String,
    pub grounding_json: String,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self {
            plan_json: r#"{"user_query": "test query", "reasoning": "needs facts",
                "plan": ["answer from context"], "search_queries": ["test query"]}"#
                .to_string(),
            rewrite: "test query".to_string(),
            query_entities_json: r#"{"entities": []}"#.to_string(),
            history_entities_json: r#"{"entities": []}"#.to_string(),
            draft: "[KB] A grounded claim from context.".to_string(),
            grounding_json: r#"{"is_grounded": true, "unsupported_claims": []}"#.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedLlm {
    /// The synthesis prompts observed so far
    pub fn synthesis_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.messages[0].content == prompts::SYNTHESIS_SYSTEM)
            .map(|r| r.messages[1].content.clone())
            .collect()
    }

    fn respond(&self, request: &CompletionRequest) -> String {
        let system = request.messages[0].content.as_str();
        let user = request.messages[1].content.as_str();

        if system == prompts::PLANNER_SYSTEM {
            self.plan_json.clone()
        } else if system == prompts::REWRITE_SYSTEM {
            self.rewrite.clone()
        } else if system == prompts::EXTRACTION_SYSTEM {
            // History extraction asks about already-discussed entities
            if user.contains("already been discussed") {
                self.history_entities_json.clone()
            } else {
                self.query_entities_json.clone()
            }
        } else if system == prompts::SYNTHESIS_SYSTEM {
            self.draft.clone()
        } else if system == prompts::GROUNDING_SYSTEM {
            self.grounding_json.clone()
        } else {
            panic!("Unexpected system prompt in test: {system}");
        }
    }
}

impl CompletionBackend for ScriptedLlm {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String>> {
        let response = self.respond(&request);
        self.requests.lock().unwrap().push(request);
        Box::pin(async move { Ok(response) })
    }

    fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> BoxFuture<'_, Result<StreamingResponse>> {
        let response = self.respond(&request);
        self.requests.lock().unwrap().push(request);
        Box::pin(async move { Ok(StreamingResponse::from_chunks(vec![response])) })
    }
}

/// Semantic source backed by a fixed item list
///
/// Applies the same contract as the HTTP source: items below `min_score` or
/// tagged with an excluded entity are never returned. Records the exclusion
/// sets it was queried with.
pub struct FixedSemanticSource {
    items: Vec<(EvidenceItem, Option<String>)>,
    pub seen_exclusions: Mutex<Vec<Vec<String>>>,
}

impl FixedSemanticSource {
    pub fn new(items: Vec<(EvidenceItem, Option<String>)>) -> Self {
        Self {
            items,
            seen_exclusions: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl SemanticSource for FixedSemanticSource {
    fn query<'a>(
        &'a self,
        _query: &'a str,
        top_k: usize,
        min_score: f32,
        exclude_entities: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<EvidenceItem>>> {
        Box::pin(async move {
            self.seen_exclusions
                .lock()
                .unwrap()
                .push(exclude_entities.to_vec());

            let items = self
                .items
                .iter()
                .filter(|(item, _)| item.score >= min_score)
                .filter(|(_, entity)| {
                    entity.as_ref().map_or(true, |e| {
                        !exclude_entities
                            .iter()
                            .any(|x| x.eq_ignore_ascii_case(e))
                    })
                })
                .map(|(item, _)| item.clone())
                .take(top_k)
                .collect();

            Ok(items)
        })
    }
}

/// Encyclopedic source backed by a fixed lookup table
pub struct FixedEncyclopedicSource {
    entries: Vec<EvidenceItem>,
}

impl FixedEncyclopedicSource {
    pub fn new(entries: Vec<EvidenceItem>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl EncyclopedicSource for FixedEncyclopedicSource {
    fn summarize<'a>(&'a self, term: &'a str) -> BoxFuture<'a, Result<Option<EvidenceItem>>> {
        Box::pin(async move {
            Ok(self
                .entries
                .iter()
                .find(|item| item.title.eq_ignore_ascii_case(term))
                .cloned())
        })
    }
}

/// Web source backed by a fixed item list
pub struct FixedWebSource {
    items: Vec<EvidenceItem>,
}

impl FixedWebSource {
    pub fn new(items: Vec<EvidenceItem>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl WebSearchSource for FixedWebSource {
    fn search<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, Result<Vec<EvidenceItem>>> {
        Box::pin(async move { Ok(self.items.clone()) })
    }
}

/// Build a semantic evidence item for tests
pub fn semantic_item(id: &str, score: f32, title: &str, body: &str) -> EvidenceItem {
    EvidenceItem {
        id: id.to_string(),
        source: SourceKind::Semantic,
        score,
        tier: None,
        title: title.to_string(),
        body: body.to_string(),
        link: None,
    }
}
