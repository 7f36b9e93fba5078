//! Groundedness verification
//!
//! Two independent designs for the same contract, kept separate on purpose:
//! - [`GroundednessVerifier`]: LLM-based sentence-by-sentence grounding gate
//! - [`detect_hallucinations`]: pure keyword-overlap heuristic for
//!   lower-cost/offline checking
//!
//! Both feed `generate_quality_report` through their confidence numbers, but
//! the pipeline's approve/reject gate is the LLM verifier alone.

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::ContextBundle;
use crate::errors::Result;
use crate::errors::WealthRagError;
use crate::llm::prompts;
use crate::llm::CompletionRequest;
use crate::llm::LlmService;

/// Sentences at or below this length are trivial and always count supported
const TRIVIAL_SENTENCE_CHARS: usize = 20;

/// Literal prefix length checked against the source text
const PREFIX_MATCH_CHARS: usize = 50;

/// Keywords shorter than this are ignored by the overlap check
const MIN_KEYWORD_CHARS: usize = 5;

/// Keyword overlap above which a sentence counts as supported
const KEYWORD_OVERLAP_THRESHOLD: f32 = 0.5;

/// Aggregate confidence at or above which the heuristic approves
const APPROVE_THRESHOLD: f32 = 0.6;

/// Result of the groundedness gate for one draft answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_grounded: bool,
    #[serde(default)]
    pub unsupported_claims: Vec<String>,
}

/// Outcome of the offline hallucination heuristic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HallucinationReport {
    /// `supported_sentences / total_sentences`
    pub confidence: f32,
    pub approved: bool,
    pub unsupported_sentences: Vec<String>,
}

/// Verifier stage: LLM grounding check over the same assembled context
pub struct GroundednessVerifier {
    llm: LlmService,
}

impl GroundednessVerifier {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    /// Check a draft answer against the context bundle
    ///
    /// A draft that states it cannot answer is always grounded. A verifier
    /// response that fails to parse closes the gate (not grounded) rather
    /// than failing the request; hard I/O errors still propagate.
    pub async fn verify(
        &self,
        draft: &str,
        bundle: &ContextBundle,
    ) -> Result<VerificationResult> {
        if draft.contains(prompts::REFUSAL_SENTENCE) {
            debug!("Draft is a refusal; grounded by definition");
            return Ok(VerificationResult {
                is_grounded: true,
                unsupported_claims: Vec::new(),
            });
        }

        let request = CompletionRequest::new(
            prompts::GROUNDING_SYSTEM,
            prompts::build_grounding_prompt(draft, &bundle.all_text()),
        );

        match self
            .llm
            .complete_structured::<VerificationResult>(request)
            .await
        {
            Ok(result) => Ok(result),
            Err(WealthRagError::StructuredOutput(msg)) => {
                warn!("Grounding check output malformed, closing the gate: {}", msg);
                Ok(VerificationResult {
                    is_grounded: false,
                    unsupported_claims: Vec::new(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Offline hallucination heuristic
///
/// Splits the answer into sentences and counts a sentence as supported when a
/// literal 50-character prefix of it appears in the concatenated lowercase
/// source text, or when more than half of its non-trivial keywords do.
#[must_use]
pub fn detect_hallucinations(answer: &str, sources: &[&str]) -> HallucinationReport {
    let source_text = sources.join("\n").to_lowercase();
    let sentences = split_sentences(answer);

    if sentences.is_empty() {
        return HallucinationReport {
            confidence: 1.0,
            approved: true,
            unsupported_sentences: Vec::new(),
        };
    }

    let mut supported = 0_usize;
    let mut unsupported_sentences = Vec::new();

    for sentence in &sentences {
        if is_sentence_supported(sentence, &source_text) {
            supported += 1;
        } else {
            unsupported_sentences.push((*sentence).to_string());
        }
    }

    let confidence = supported as f32 / sentences.len() as f32;

    HallucinationReport {
        confidence,
        approved: confidence >= APPROVE_THRESHOLD,
        unsupported_sentences,
    }
}

fn is_sentence_supported(sentence: &str, source_text: &str) -> bool {
    // Trivial sentences carry no checkable claim
    if sentence.chars().count() <= TRIVIAL_SENTENCE_CHARS {
        return true;
    }

    let lowered = strip_source_tags(sentence).to_lowercase();

    // Literal prefix match
    let prefix: String = lowered.chars().take(PREFIX_MATCH_CHARS).collect();
    if source_text.contains(prefix.trim()) {
        return true;
    }

    // Keyword overlap
    let keywords: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
        .collect();

    if keywords.is_empty() {
        return true;
    }

    let matched = keywords
        .iter()
        .filter(|keyword| source_text.contains(**keyword))
        .count();

    matched as f32 / keywords.len() as f32 > KEYWORD_OVERLAP_THRESHOLD
}

/// Remove inline source tags before text comparison
fn strip_source_tags(sentence: &str) -> String {
    sentence
        .replace("[KB]", "")
        .replace("[WIKI]", "")
        .replace("[WEB]", "")
}

/// Split text into trimmed, non-empty sentences
fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
