//! Query planning from the conversation

use tracing::debug;

use super::Conversation;
use super::Plan;
use crate::errors::Result;
use crate::errors::WealthRagError;
use crate::llm::prompts;
use crate::llm::CompletionRequest;
use crate::llm::LlmService;

/// Maximum search queries carried forward from a plan
const MAX_SEARCH_QUERIES: usize = 3;

/// Planner stage: interprets the conversation and emits a structured plan
pub struct QueryPlanner {
    llm: LlmService,
    history_window: usize,
}

impl QueryPlanner {
    pub fn new(llm: LlmService, history_window: usize) -> Self {
        Self {
            llm,
            history_window,
        }
    }

    /// Produce a plan for the conversation's latest question
    ///
    /// # Errors
    /// - [`WealthRagError::PlanParsing`] when the generation capability
    ///   returns malformed structured output. The pipeline cannot proceed
    ///   without a plan, so this is fatal for the request.
    /// - Generation/HTTP errors from the completion call.
    pub async fn plan(&self, conversation: &Conversation<'_>) -> Result<Plan> {
        let history = conversation.render_history(self.history_window);
        let question = conversation.latest_message();

        let request = CompletionRequest::new(
            prompts::PLANNER_SYSTEM,
            prompts::build_planner_prompt(&history, question),
        );

        let mut plan: Plan = self
            .llm
            .complete_structured(request)
            .await
            .map_err(|e| match e {
                WealthRagError::StructuredOutput(msg) => WealthRagError::PlanParsing(msg),
                other => other,
            })?;

        if plan.user_query.trim().is_empty() {
            plan.user_query = question.to_string();
        }
        plan.search_queries.retain(|q| !q.trim().is_empty());
        plan.search_queries.truncate(MAX_SEARCH_QUERIES);

        debug!(
            "Plan produced: {} steps, {} search queries",
            plan.plan.len(),
            plan.search_queries.len()
        );

        Ok(plan)
    }
}
