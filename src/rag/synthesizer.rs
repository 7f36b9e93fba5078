//! Cited answer synthesis from assembled context

use tracing::debug;

use super::ContextBundle;
use super::Plan;
use crate::errors::Result;
use crate::llm::prompts;
use crate::llm::CompletionRequest;
use crate::llm::LlmService;
use crate::sources::EvidenceItem;

/// Synthesizer stage: one prompt, three delimited context sections
pub struct AnswerSynthesizer {
    llm: LlmService,
}

impl AnswerSynthesizer {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    /// Generate a draft answer strictly from the bundle
    pub async fn synthesize(&self, plan: &Plan, bundle: &ContextBundle) -> Result<String> {
        let request = self.build_request(plan, bundle);
        let draft = self.llm.complete_text(request).await?;
        debug!("Synthesized draft of {} chars", draft.len());
        Ok(draft.trim().to_string())
    }

    fn build_request(&self, plan: &Plan, bundle: &ContextBundle) -> CompletionRequest {
        let prompt = prompts::build_synthesis_prompt(
            &render_section(&bundle.semantic),
            &render_section(&bundle.encyclopedic),
            &render_section(&bundle.web),
            &render_plan_steps(&plan.plan),
            &plan.user_query,
        );
        CompletionRequest::new(prompts::SYNTHESIS_SYSTEM, prompt)
    }
}

/// Render one context section; empty sections render as "None"
#[must_use]
pub fn render_section(items: &[EvidenceItem]) -> String {
    if items.is_empty() {
        return "None".to_string();
    }

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let mut entry = format!("[{}] {}\n{}", idx + 1, item.title, item.body);
            if let Some(link) = &item.link {
                entry.push_str(&format!("\nSource: {link}"));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render plan steps as a numbered list
fn render_plan_steps(steps: &[String]) -> String {
    if steps.is_empty() {
        return "1. Answer the question from the available context.".to_string();
    }

    steps
        .iter()
        .enumerate()
        .map(|(idx, step)| format!("{}. {}", idx + 1, step))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceKind;

    #[test]
    fn test_render_section_empty_is_none() {
        assert_eq!(render_section(&[]), "None");
    }

    #[test]
    fn test_render_section_numbers_items() {
        let items = vec![
            EvidenceItem {
                id: "a".to_string(),
                source: SourceKind::Semantic,
                score: 0.9,
                tier: None,
                title: "Acme sale".to_string(),
                body: "Jane Doe sold Acme.".to_string(),
                link: Some("https://example.com/a".to_string()),
            },
            EvidenceItem {
                id: "b".to_string(),
                source: SourceKind::Semantic,
                score: 0.7,
                tier: None,
                title: "Second event".to_string(),
                body: "Another event.".to_string(),
                link: None,
            },
        ];
        let section = render_section(&items);
        assert!(section.starts_with("[1] Acme sale"));
        assert!(section.contains("[2] Second event"));
        assert!(section.contains("Source: https://example.com/a"));
    }

    #[test]
    fn test_render_plan_steps_numbered() {
        let steps = vec!["find people".to_string(), "list them".to_string()];
        assert_eq!(render_plan_steps(&steps), "1. find people\n2. list them");
    }
}
