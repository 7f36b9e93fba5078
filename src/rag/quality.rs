//! Context quality assessment and cross-source validation
//!
//! Everything here is a pure function over an assembled [`ContextBundle`]:
//! no I/O, same input gives the same output. The entity and conflict
//! heuristics are explicitly best-effort; the conflict check is a pluggable
//! strategy so a stronger NLI-based detector can be swapped in without
//! touching the scoring contract.

use serde::Serialize;

use super::ContextBundle;
use crate::sources::EvidenceItem;
use crate::sources::QualityTier;

/// Confidence contributed by a high-tier encyclopedic summary
const HIGH_TIER_CONFIDENCE: f32 = 0.7;

/// Confidence contributed by a medium-tier encyclopedic summary
const MEDIUM_TIER_CONFIDENCE: f32 = 0.5;

/// Sufficiency cutoff, matching the semantic similarity threshold
const SUFFICIENCY_THRESHOLD: f32 = 0.38;

/// Best-semantic-score floor for the high-confidence flag
const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.75;

/// Name similarity above which two entities refer to the same real-world one
const ENTITY_MATCH_THRESHOLD: f32 = 0.8;

/// Penalty applied to the blended score when sources conflict
const CONFLICT_PENALTY: f32 = 0.15;

/// Penalty for answers too short to be substantive
const SHORT_ANSWER_PENALTY: f32 = 0.1;

/// Answers below this length take the short-answer penalty
const MIN_ANSWER_CHARS: usize = 40;

/// Derived, read-only summary over a context bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityAssessment {
    pub confidence: f32,
    pub sufficient: bool,
    pub high_confidence: bool,
}

/// Four-way cross-source reliability classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityLevel {
    SingleSource,
    Confirmed,
    Conflicting,
    Unconfirmed,
}

/// Itemized cross-validation outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityReport {
    pub level: ReliabilityLevel,
    /// Entity names confirmed by both sources
    pub confirmations: Vec<String>,
    /// Entity names with conflicting facts across sources
    pub conflicts: Vec<String>,
}

/// Recommendation derived from the blended quality score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Approve,
    Review,
    Reject,
}

/// Blended quality report for operator observability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub overall_score: f32,
    pub recommendation: Recommendation,
}

/// Strategy seam for fact-conflict detection between matched evidence pairs
pub trait ConflictDetector: Send + Sync {
    /// Whether the two items state conflicting facts about the same entity
    fn is_conflicting(&self, semantic: &EvidenceItem, encyclopedic: &EvidenceItem) -> bool;
}

/// Default detector: treats every matched pair as agreement
///
/// A stand-in until a real NLI comparison exists; classification then never
/// reports `Conflicting` on its own.
pub struct AgreementByDefault;

impl ConflictDetector for AgreementByDefault {
    fn is_conflicting(&self, _semantic: &EvidenceItem, _encyclopedic: &EvidenceItem) -> bool {
        false
    }
}

/// Assessor stage: pure scoring over the assembled context
pub struct ContextQualityAssessor {
    detector: Box<dyn ConflictDetector>,
}

impl ContextQualityAssessor {
    pub fn new(detector: Box<dyn ConflictDetector>) -> Self {
        Self { detector }
    }

    /// Score the bundle for sufficiency and confidence
    #[must_use]
    pub fn assess(&self, bundle: &ContextBundle) -> QualityAssessment {
        let best_semantic = bundle
            .semantic
            .iter()
            .map(|item| item.score)
            .fold(0.0_f32, f32::max);

        let tier_confidence = if bundle
            .encyclopedic
            .iter()
            .any(|item| item.tier == Some(QualityTier::High))
        {
            HIGH_TIER_CONFIDENCE
        } else if bundle
            .encyclopedic
            .iter()
            .any(|item| item.tier == Some(QualityTier::Medium))
        {
            MEDIUM_TIER_CONFIDENCE
        } else {
            0.0
        };

        let confidence = best_semantic.max(tier_confidence);

        QualityAssessment {
            confidence,
            sufficient: confidence >= SUFFICIENCY_THRESHOLD,
            high_confidence: best_semantic >= HIGH_CONFIDENCE_THRESHOLD,
        }
    }

    /// Detect cross-source agreement and conflict
    ///
    /// Pairs a coarse entity from each semantic item against one from each
    /// encyclopedic item; pairs above the name-similarity threshold refer to
    /// the same real-world entity and are handed to the conflict detector.
    #[must_use]
    pub fn cross_validate(&self, bundle: &ContextBundle) -> ReliabilityReport {
        if bundle.semantic.is_empty() || bundle.encyclopedic.is_empty() {
            return ReliabilityReport {
                level: ReliabilityLevel::SingleSource,
                confirmations: Vec::new(),
                conflicts: Vec::new(),
            };
        }

        let mut confirmations = Vec::new();
        let mut conflicts = Vec::new();

        for semantic_item in &bundle.semantic {
            let semantic_entity = extract_coarse_entity(&semantic_item.body, &semantic_item.title);
            for encyclopedic_item in &bundle.encyclopedic {
                let encyclopedic_entity =
                    extract_coarse_entity(&encyclopedic_item.body, &encyclopedic_item.title);

                if name_similarity(&semantic_entity, &encyclopedic_entity) <= ENTITY_MATCH_THRESHOLD
                {
                    continue;
                }

                if self.detector.is_conflicting(semantic_item, encyclopedic_item) {
                    conflicts.push(semantic_entity.clone());
                } else {
                    confirmations.push(semantic_entity.clone());
                }
            }
        }

        let level = if !conflicts.is_empty() {
            ReliabilityLevel::Conflicting
        } else if !confirmations.is_empty() {
            ReliabilityLevel::Confirmed
        } else {
            ReliabilityLevel::Unconfirmed
        };

        ReliabilityReport {
            level,
            confirmations,
            conflicts,
        }
    }
}

impl Default for ContextQualityAssessor {
    fn default() -> Self {
        Self::new(Box::new(AgreementByDefault))
    }
}

/// Blend context confidence and grounding confidence into one recommendation
///
/// Canonical formula: `0.6 * context + 0.4 * grounding`, minus a conflict
/// penalty when sources disagree and a flat penalty for trivially short
/// answers, clamped to [0, 1].
#[must_use]
pub fn generate_quality_report(
    context_confidence: f32,
    grounding_confidence: f32,
    reliability: ReliabilityLevel,
    answer: &str,
) -> QualityReport {
    let mut score = 0.6 * context_confidence + 0.4 * grounding_confidence;

    if reliability == ReliabilityLevel::Conflicting {
        score -= CONFLICT_PENALTY;
    }
    if answer.chars().count() < MIN_ANSWER_CHARS {
        score -= SHORT_ANSWER_PENALTY;
    }

    let overall_score = score.clamp(0.0, 1.0);
    let recommendation = if overall_score >= 0.6 {
        Recommendation::Approve
    } else if overall_score >= 0.4 {
        Recommendation::Review
    } else {
        Recommendation::Reject
    };

    QualityReport {
        overall_score,
        recommendation,
    }
}

/// Coarse entity heuristic: first run of capitalized words, title fallback
#[must_use]
pub fn extract_coarse_entity(text: &str, fallback_title: &str) -> String {
    let mut run: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        let cleaned = word.trim_matches(|c: char| !c.is_alphanumeric());
        let is_capitalized = cleaned
            .chars()
            .next()
            .is_some_and(char::is_uppercase);

        if is_capitalized {
            run.push(cleaned);
        } else if !run.is_empty() {
            break;
        }
    }

    if run.is_empty() {
        fallback_title.to_string()
    } else {
        run.join(" ")
    }
}

/// Name-substring similarity in [0, 1]
///
/// Exact match is 1.0; containment scores by length ratio; otherwise the
/// fraction of shared name tokens.
#[must_use]
pub fn name_similarity(a: &str, b: &str) -> f32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if longer.contains(shorter.as_str()) {
        return shorter.len() as f32 / longer.len() as f32;
    }

    let a_tokens: Vec<&str> = a.split_whitespace().collect();
    let b_tokens: Vec<&str> = b.split_whitespace().collect();
    let shared = a_tokens.iter().filter(|t| b_tokens.contains(t)).count();
    let total = a_tokens.len().max(b_tokens.len());
    shared as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::EvidenceItem;
    use crate::sources::SourceKind;

    fn semantic_item(score: f32, body: &str) -> EvidenceItem {
        EvidenceItem {
            id: format!("s-{body}"),
            source: SourceKind::Semantic,
            score,
            tier: None,
            title: "Event".to_string(),
            body: body.to_string(),
            link: None,
        }
    }

    fn encyclopedic_item(tier: QualityTier, title: &str, body: &str) -> EvidenceItem {
        EvidenceItem {
            id: format!("w-{title}"),
            source: SourceKind::Encyclopedic,
            score: 0.0,
            tier: Some(tier),
            title: title.to_string(),
            body: body.to_string(),
            link: None,
        }
    }

    #[test]
    fn test_assess_uses_best_semantic_score() {
        let bundle = ContextBundle {
            semantic: vec![semantic_item(0.5, "a"), semantic_item(0.8, "b")],
            ..ContextBundle::default()
        };
        let assessment = ContextQualityAssessor::default().assess(&bundle);
        assert!((assessment.confidence - 0.8).abs() < f32::EPSILON);
        assert!(assessment.sufficient);
        assert!(assessment.high_confidence);
    }

    #[test]
    fn test_assess_tier_heuristic_fallback() {
        let bundle = ContextBundle {
            encyclopedic: vec![encyclopedic_item(QualityTier::Medium, "Acme", "body")],
            ..ContextBundle::default()
        };
        let assessment = ContextQualityAssessor::default().assess(&bundle);
        assert!((assessment.confidence - 0.5).abs() < f32::EPSILON);
        assert!(assessment.sufficient);
        assert!(!assessment.high_confidence);
    }

    #[test]
    fn test_assess_empty_bundle_insufficient() {
        let assessment = ContextQualityAssessor::default().assess(&ContextBundle::default());
        assert!((assessment.confidence).abs() < f32::EPSILON);
        assert!(!assessment.sufficient);
    }

    #[test]
    fn test_assess_is_pure() {
        let bundle = ContextBundle {
            semantic: vec![semantic_item(0.6, "Jane Doe sold Acme")],
            encyclopedic: vec![encyclopedic_item(QualityTier::High, "Jane Doe", "Jane Doe is a founder")],
            ..ContextBundle::default()
        };
        let assessor = ContextQualityAssessor::default();
        assert_eq!(assessor.assess(&bundle), assessor.assess(&bundle));
        assert_eq!(assessor.cross_validate(&bundle), assessor.cross_validate(&bundle));
    }

    #[test]
    fn test_cross_validate_single_source_when_one_side_empty() {
        let bundle = ContextBundle {
            semantic: vec![semantic_item(0.9, "Jane Doe sold Acme")],
            ..ContextBundle::default()
        };
        let report = ContextQualityAssessor::default().cross_validate(&bundle);
        assert_eq!(report.level, ReliabilityLevel::SingleSource);

        let report = ContextQualityAssessor::default().cross_validate(&ContextBundle::default());
        assert_eq!(report.level, ReliabilityLevel::SingleSource);
    }

    #[test]
    fn test_cross_validate_confirmed_on_matching_entities() {
        let bundle = ContextBundle {
            semantic: vec![semantic_item(0.9, "Jane Doe sold her stake in Acme.")],
            encyclopedic: vec![encyclopedic_item(
                QualityTier::High,
                "Jane Doe",
                "Jane Doe is the founder of Acme Corporation.",
            )],
            ..ContextBundle::default()
        };
        let report = ContextQualityAssessor::default().cross_validate(&bundle);
        assert_eq!(report.level, ReliabilityLevel::Confirmed);
        assert!(!report.confirmations.is_empty());
    }

    #[test]
    fn test_cross_validate_unconfirmed_on_disjoint_entities() {
        let bundle = ContextBundle {
            semantic: vec![semantic_item(0.9, "Jane Doe sold her stake.")],
            encyclopedic: vec![encyclopedic_item(
                QualityTier::High,
                "Gadget Industries",
                "Gadget Industries makes gadgets.",
            )],
            ..ContextBundle::default()
        };
        let report = ContextQualityAssessor::default().cross_validate(&bundle);
        assert_eq!(report.level, ReliabilityLevel::Unconfirmed);
    }

    struct AlwaysConflicting;

    impl ConflictDetector for AlwaysConflicting {
        fn is_conflicting(&self, _a: &EvidenceItem, _b: &EvidenceItem) -> bool {
            true
        }
    }

    #[test]
    fn test_cross_validate_conflicting_with_strict_detector() {
        let bundle = ContextBundle {
            semantic: vec![semantic_item(0.9, "Jane Doe sold her stake in Acme.")],
            encyclopedic: vec![encyclopedic_item(
                QualityTier::High,
                "Jane Doe",
                "Jane Doe retains full ownership of Acme.",
            )],
            ..ContextBundle::default()
        };
        let assessor = ContextQualityAssessor::new(Box::new(AlwaysConflicting));
        let report = assessor.cross_validate(&bundle);
        assert_eq!(report.level, ReliabilityLevel::Conflicting);
        assert!(!report.conflicts.is_empty());
    }

    #[test]
    fn test_conflicting_score_strictly_below_confirmed() {
        let answer = "Jane Doe sold her stake in Acme Corporation last quarter.";
        let confirmed =
            generate_quality_report(0.8, 0.9, ReliabilityLevel::Confirmed, answer);
        let conflicting =
            generate_quality_report(0.8, 0.9, ReliabilityLevel::Conflicting, answer);
        assert!(conflicting.overall_score < confirmed.overall_score);
    }

    #[test]
    fn test_quality_report_short_answer_penalty() {
        let long = "x".repeat(80);
        let with_penalty = generate_quality_report(0.7, 0.7, ReliabilityLevel::Confirmed, "Short.");
        let without_penalty =
            generate_quality_report(0.7, 0.7, ReliabilityLevel::Confirmed, &long);
        assert!(with_penalty.overall_score < without_penalty.overall_score);
    }

    #[test]
    fn test_quality_report_recommendation_bands() {
        let long = "x".repeat(80);
        let approve = generate_quality_report(0.8, 0.8, ReliabilityLevel::Confirmed, &long);
        assert_eq!(approve.recommendation, Recommendation::Approve);

        let review = generate_quality_report(0.5, 0.5, ReliabilityLevel::Confirmed, &long);
        assert_eq!(review.recommendation, Recommendation::Review);

        let reject = generate_quality_report(0.1, 0.1, ReliabilityLevel::Confirmed, &long);
        assert_eq!(reject.recommendation, Recommendation::Reject);
    }

    #[test]
    fn test_extract_coarse_entity_first_capitalized_run() {
        assert_eq!(
            extract_coarse_entity("the founder Jane Doe sold shares", "fallback"),
            "Jane Doe"
        );
    }

    #[test]
    fn test_extract_coarse_entity_title_fallback() {
        assert_eq!(
            extract_coarse_entity("no capitalized words here", "The Title"),
            "The Title"
        );
    }

    #[test]
    fn test_name_similarity_exact_and_containment() {
        assert!((name_similarity("Jane Doe", "jane doe") - 1.0).abs() < f32::EPSILON);
        assert!(name_similarity("Jane Doe", "Jane Doe Smith") > 0.5);
        assert!(name_similarity("Jane Doe", "Acme Corp") < 0.1);
    }
}
