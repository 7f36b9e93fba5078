//! Pipeline orchestrator: Plan -> Retrieve -> Assess -> Synthesize -> Verify
//!
//! The orchestrator is the only component with cross-cutting control flow;
//! every other stage is request/response. Callers only ever see a grounded
//! cited answer, the fixed refusal, the fixed safe fallback, or one generic
//! pipeline error.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use super::quality::generate_quality_report;
use super::quality::QualityReport;
use super::AnswerSynthesizer;
use super::ChatTurn;
use super::ContextQualityAssessor;
use super::ContextRetriever;
use super::Conversation;
use super::GroundednessVerifier;
use super::QueryPlanner;
use super::ReliabilityLevel;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::llm::LlmService;
use crate::llm::StreamingResponse;
use crate::rag::verifier::detect_hallucinations;
use crate::sources::EncyclopedicSource;
use crate::sources::HttpEncyclopedicSource;
use crate::sources::HttpSemanticSource;
use crate::sources::HttpWebSearchSource;
use crate::sources::SemanticSource;
use crate::sources::WebSearchSource;

/// Fixed safe-fallback sentence shown instead of any non-grounded draft
pub const FALLBACK_SENTENCE: &str =
    "I couldn't verify an answer against my knowledge base. Please try rephrasing your question.";

/// Pipeline stages, in strict request order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Planning,
    Retrieving,
    Synthesizing,
    Verifying,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Planning => "planning",
            Self::Retrieving => "retrieving",
            Self::Synthesizing => "synthesizing",
            Self::Verifying => "verifying",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Operator-only diagnostics; never part of the user-visible answer
#[derive(Debug, Clone, Serialize)]
pub struct PipelineDiagnostics {
    pub request_id: Uuid,
    pub stage: PipelineStage,
    pub semantic_count: usize,
    pub encyclopedic_count: usize,
    pub web_count: usize,
    pub reliability: ReliabilityLevel,
    pub grounded: bool,
    pub quality: QualityReport,
}

/// Final pipeline output for one chat request
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// The only user-visible field
    pub answer: String,
    pub diagnostics: PipelineDiagnostics,
}

/// The RAG orchestrator
pub struct RagPipeline {
    planner: QueryPlanner,
    retriever: ContextRetriever,
    assessor: ContextQualityAssessor,
    synthesizer: AnswerSynthesizer,
    verifier: GroundednessVerifier,
    timeout: Duration,
}

impl RagPipeline {
    /// Create from explicit service handles
    ///
    /// The handles are constructed once at process start and shared across
    /// in-flight requests; nothing here is mutated after construction.
    pub fn new(
        llm: LlmService,
        semantic: Arc<dyn SemanticSource>,
        encyclopedic: Arc<dyn EncyclopedicSource>,
        web: Arc<dyn WebSearchSource>,
        retrieval: crate::config::RetrievalConfig,
    ) -> Self {
        let timeout = Duration::from_secs(retrieval.request_timeout_secs);
        Self {
            planner: QueryPlanner::new(llm.clone(), retrieval.history_window),
            retriever: ContextRetriever::new(
                semantic,
                encyclopedic,
                web,
                llm.clone(),
                retrieval,
            ),
            assessor: ContextQualityAssessor::default(),
            synthesizer: AnswerSynthesizer::new(llm.clone()),
            verifier: GroundednessVerifier::new(llm),
            timeout,
        }
    }

    /// Create the HTTP-backed pipeline from application config
    ///
    /// # Errors
    /// - HTTP client build errors
    /// - Embedding service configuration errors (invalid API keys, endpoints)
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = LlmService::from_config(config)?;
        let embeddings = Arc::new(crate::embeddings::EmbeddingClient::from_app_config(config)?);

        let semantic: Arc<dyn SemanticSource> = Arc::new(HttpSemanticSource::new(
            embeddings,
            config.sources.semantic_endpoint.clone(),
        )?);
        let encyclopedic: Arc<dyn EncyclopedicSource> = Arc::new(HttpEncyclopedicSource::new(
            config.sources.encyclopedic_endpoint.clone(),
        )?);
        let web: Arc<dyn WebSearchSource> = Arc::new(HttpWebSearchSource::new(
            config.sources.websearch_endpoint.clone(),
            config.sources.websearch_api_key.clone(),
        )?);

        Ok(Self::new(
            llm,
            semantic,
            encyclopedic,
            web,
            config.retrieval.clone(),
        ))
    }

    /// Process one chat request through the full pipeline
    ///
    /// On timeout the request is aborted and the safe fallback is returned
    /// instead of hanging; unrecoverable stage errors surface as one generic
    /// pipeline error.
    pub async fn process_chat_request(&self, turns: &[ChatTurn]) -> Result<ChatResponse> {
        let request_id = Uuid::new_v4();

        match tokio::time::timeout(self.timeout, self.run(request_id, turns)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Request {} exceeded the {}s budget, returning fallback",
                    request_id,
                    self.timeout.as_secs()
                );
                Ok(fallback_response(request_id))
            }
        }
    }

    /// Process one chat request, returning the answer as a chunk stream
    ///
    /// The draft is collected before the verifier gate; only the approved
    /// answer is re-chunked to the caller. Streaming past the gate would let
    /// unverified text reach the user.
    pub async fn process_chat_request_streaming(
        &self,
        turns: &[ChatTurn],
    ) -> Result<StreamingResponse> {
        let response = self.process_chat_request(turns).await?;
        Ok(StreamingResponse::from_chunks(chunk_answer(&response.answer)))
    }

    async fn run(&self, request_id: Uuid, turns: &[ChatTurn]) -> Result<ChatResponse> {
        let conversation = Conversation::new(turns)?;
        info!(
            "Request {}: {} -> {}",
            request_id,
            PipelineStage::Planning,
            conversation.latest_message()
        );

        // PLANNING -> RETRIEVING: always, once a plan is produced
        let plan = self.planner.plan(&conversation).await?;

        // RETRIEVING -> SYNTHESIZING: always, once all sources settled
        debug!("Request {}: {}", request_id, PipelineStage::Retrieving);
        let bundle = self.retriever.retrieve(&plan, &conversation).await?;

        let assessment = self.assessor.assess(&bundle);
        let reliability = self.assessor.cross_validate(&bundle);
        debug!(
            "Request {}: confidence {:.2}, sufficient {}, reliability {:?}",
            request_id, assessment.confidence, assessment.sufficient, reliability.level
        );

        // SYNTHESIZING -> VERIFYING: always, once a draft exists
        debug!("Request {}: {}", request_id, PipelineStage::Synthesizing);
        let draft = self.synthesizer.synthesize(&plan, &bundle).await?;

        // VERIFYING -> DONE: grounded drafts pass, everything else falls back
        debug!("Request {}: {}", request_id, PipelineStage::Verifying);
        let verification = self.verifier.verify(&draft, &bundle).await?;

        let source_texts: Vec<String> = bundle
            .semantic
            .iter()
            .chain(bundle.encyclopedic.iter())
            .chain(bundle.web.iter())
            .map(crate::sources::EvidenceItem::text)
            .collect();
        let source_refs: Vec<&str> = source_texts.iter().map(String::as_str).collect();
        let heuristic = detect_hallucinations(&draft, &source_refs);

        let quality = generate_quality_report(
            assessment.confidence,
            heuristic.confidence,
            reliability.level,
            &draft,
        );

        let answer = if verification.is_grounded {
            rewrite_source_tags(&draft)
        } else {
            warn!(
                "Request {}: draft rejected by grounding gate ({} unsupported claims)",
                request_id,
                verification.unsupported_claims.len()
            );
            FALLBACK_SENTENCE.to_string()
        };

        info!(
            "Request {}: {} (grounded: {}, quality: {:.2})",
            request_id,
            PipelineStage::Done,
            verification.is_grounded,
            quality.overall_score
        );

        Ok(ChatResponse {
            answer,
            diagnostics: PipelineDiagnostics {
                request_id,
                stage: PipelineStage::Done,
                semantic_count: bundle.semantic.len(),
                encyclopedic_count: bundle.encyclopedic.len(),
                web_count: bundle.web.len(),
                reliability: reliability.level,
                grounded: verification.is_grounded,
                quality,
            },
        })
    }
}

fn fallback_response(request_id: Uuid) -> ChatResponse {
    ChatResponse {
        answer: FALLBACK_SENTENCE.to_string(),
        diagnostics: PipelineDiagnostics {
            request_id,
            stage: PipelineStage::Failed,
            semantic_count: 0,
            encyclopedic_count: 0,
            web_count: 0,
            reliability: ReliabilityLevel::SingleSource,
            grounded: false,
            quality: generate_quality_report(0.0, 0.0, ReliabilityLevel::SingleSource, ""),
        },
    }
}

/// Translate inline source tags into presentation markup
///
/// One substitution per tag type.
#[must_use]
pub fn rewrite_source_tags(answer: &str) -> String {
    answer
        .replace("[KB]", "*(knowledge base)*")
        .replace("[WIKI]", "*(encyclopedia)*")
        .replace("[WEB]", "*(web)*")
}

/// Chunk an approved answer at word boundaries for streaming delivery
fn chunk_answer(answer: &str) -> Vec<String> {
    const CHUNK_CHARS: usize = 80;

    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in answer.split_inclusive(' ') {
        if current.chars().count() + word.chars().count() > CHUNK_CHARS && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
