//! Prompt templates for the RAG pipeline stages
//!
//! Every structured-output prompt spells out the exact JSON shape expected;
//! the matching serde contracts live next to the stage that parses them.

/// Fixed refusal sentence the synthesizer must return verbatim when no plan
/// step can be answered from context. The verifier treats it as grounded.
pub const REFUSAL_SENTENCE: &str =
    "I don't have enough information in my knowledge base to answer that question.";

/// System prompt for the query planner
pub const PLANNER_SYSTEM: &str = "You are a research planner for a wealth-event intelligence assistant. \
You never answer questions yourself; you produce a plan for how retrieved evidence should be used. \
Respond with a single JSON object and nothing else.";

/// Build the planner prompt from recent history and the current question
pub fn build_planner_prompt(history: &str, question: &str) -> String {
    format!(
        r#"Conversation so far:
{history}

Latest user question: {question}

Produce a research plan as a single JSON object with exactly these fields:
- "user_query": the user's question, restated as a standalone query
- "reasoning": brief free-text reasoning about what must be researched
- "plan": an ordered list of imperative steps describing how to use retrieved evidence
  (for example: "exclude entities already mentioned in the conversation",
  "synthesize a list of matching people", "state that data is insufficient if absent")
- "search_queries": 1 to 3 self-contained research queries

Rules:
1. Resolve pronouns and follow-ups using the conversation history.
2. If the question is a follow-up like "who else", the search queries must
   explicitly exclude the entities already named in the conversation.
3. Search queries must be non-empty whenever answering requires external facts.

JSON:"#
    )
}

/// System prompt for query rewriting
pub const REWRITE_SYSTEM: &str = "You rewrite follow-up questions into standalone search queries. \
Respond with the rewritten query text only, no explanations.";

/// Build the standalone-query rewrite prompt
pub fn build_rewrite_prompt(history: &str, question: &str) -> String {
    format!(
        r"Conversation so far:
{history}

Latest user message: {question}

Rewrite the latest user message as a single standalone retrieval query that
makes sense without the conversation. Preserve names, resolve pronouns, and
keep it concise.

Rewritten query:"
    )
}

/// System prompt for entity extraction
pub const EXTRACTION_SYSTEM: &str = "You extract named entities (people and companies) from text. \
Respond with a single JSON object and nothing else.";

/// Build the entity extraction prompt for a query
pub fn build_entity_extraction_prompt(text: &str) -> String {
    format!(
        r#"Text: {text}

Extract the named people and companies mentioned in the text.

Respond with a single JSON object: {{"entities": ["Name One", "Name Two"]}}
Use an empty list if there are none.

JSON:"#
    )
}

/// Build the entity extraction prompt over conversation history
///
/// Used to build the exclusion set so follow-ups like "who else" do not
/// return entities already discussed.
pub fn build_history_entity_prompt(history: &str) -> String {
    format!(
        r#"Conversation:
{history}

List every person and company that has already been discussed in the
conversation above (both in questions and in answers).

Respond with a single JSON object: {{"entities": ["Name One", "Name Two"]}}
Use an empty list if there are none.

JSON:"#
    )
}

/// System prompt for answer synthesis
pub const SYNTHESIS_SYSTEM: &str = "You are a wealth-event intelligence assistant. \
You answer strictly from the context you are given and tag every factual claim with its source.";

/// Build the synthesis prompt from the three context sections, the plan steps
/// and the user question
pub fn build_synthesis_prompt(
    semantic_section: &str,
    encyclopedic_section: &str,
    web_section: &str,
    plan_steps: &str,
    question: &str,
) -> String {
    format!(
        r"=== INTERNAL KNOWLEDGE BASE ===
{semantic_section}

=== ENCYCLOPEDIC CONTEXT ===
{encyclopedic_section}

=== WEB SEARCH CONTEXT ===
{web_section}

Plan (follow these steps in order):
{plan_steps}

Question: {question}

Protocol:
1. Use ONLY the context sections above. Do not use outside knowledge.
2. Tag every factual claim with its originating source: [KB] for the internal
   knowledge base, [WIKI] for encyclopedic context, [WEB] for web search.
3. Follow the plan steps in order. If a step cannot be completed because the
   context is insufficient, say so explicitly for that step.
4. If no step can be answered at all, respond with exactly this sentence and
   nothing else: {REFUSAL_SENTENCE}

Answer:"
    )
}

/// System prompt for the groundedness check
pub const GROUNDING_SYSTEM: &str = "You are a strict fact checker. \
You verify that an answer is fully supported by the provided context. \
Respond with a single JSON object and nothing else.";

/// Build the grounding-check prompt for a draft answer
pub fn build_grounding_prompt(answer: &str, context: &str) -> String {
    format!(
        r#"Context:
{context}

Draft answer:
{answer}

Evaluate the draft answer sentence by sentence. A sentence is supported if its
factual content appears in the context. Sentences that only state the answer
cannot be given (insufficient information) always count as supported.

Respond with a single JSON object:
{{"is_grounded": true or false, "unsupported_claims": ["claim text", ...]}}

"is_grounded" must be false if any factual claim is not supported by the
context. Use an empty list when every claim is supported.

JSON:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_prompt_contains_sections_and_refusal() {
        let prompt = build_synthesis_prompt("None", "None", "None", "1. step", "who?");
        assert!(prompt.contains("=== INTERNAL KNOWLEDGE BASE ===\nNone"));
        assert!(prompt.contains("=== ENCYCLOPEDIC CONTEXT ===\nNone"));
        assert!(prompt.contains("=== WEB SEARCH CONTEXT ===\nNone"));
        assert!(prompt.contains(REFUSAL_SENTENCE));
    }

    #[test]
    fn test_planner_prompt_mentions_exclusion_rule() {
        let prompt = build_planner_prompt("(none)", "Who else?");
        assert!(prompt.contains("explicitly exclude"));
        assert!(prompt.contains("search_queries"));
    }
}
