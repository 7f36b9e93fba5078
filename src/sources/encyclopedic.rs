//! Encyclopedic summary lookup with content-quality validation

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::EncyclopedicSource;
use super::EvidenceItem;
use super::QualityTier;
use super::SourceKind;
use crate::errors::Result;
use crate::errors::WealthRagError;

/// Minimum summary length accepted by the content validator
const MIN_SUMMARY_CHARS: usize = 40;

/// Summary length that earns the high quality tier
const HIGH_TIER_CHARS: usize = 400;

/// Summary length that earns the medium quality tier
const MEDIUM_TIER_CHARS: usize = 150;

/// Markers of disambiguation or error pages the validator rejects
const REJECT_MARKERS: &[&str] = &[
    "may refer to",
    "can refer to",
    "is a disambiguation",
    "does not exist",
];

/// Encyclopedic source over a REST summary API
pub struct HttpEncyclopedicSource {
    endpoint: String,
    client: Client,
}

impl HttpEncyclopedicSource {
    pub fn new(endpoint: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .map_err(|e| WealthRagError::Http(e.to_string()))?;

        Ok(Self { endpoint, client })
    }
}

impl EncyclopedicSource for HttpEncyclopedicSource {
    fn summarize<'a>(&'a self, term: &'a str) -> BoxFuture<'a, Result<Option<EvidenceItem>>> {
        Box::pin(async move {
            #[derive(Deserialize)]
            struct SummaryResponse {
                title: String,
                #[serde(default)]
                extract: String,
                #[serde(default)]
                content_urls: Option<ContentUrls>,
            }

            #[derive(Deserialize)]
            struct ContentUrls {
                desktop: PageUrl,
            }

            #[derive(Deserialize)]
            struct PageUrl {
                page: String,
            }

            let encoded = term.replace(' ', "_");
            let url = format!("{}/page/summary/{}", self.endpoint, encoded);
            debug!("Looking up encyclopedic summary: {}", url);

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| WealthRagError::Http(e.to_string()))?;

            // A missing entry is a valid empty outcome, not an error
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !response.status().is_success() {
                let status = response.status();
                return Err(WealthRagError::SourceUnavailable(format!(
                    "Encyclopedic source error ({status})"
                )));
            }

            let summary: SummaryResponse = response.json().await.map_err(|e| {
                WealthRagError::SourceUnavailable(format!("Failed to parse summary: {e}"))
            })?;

            let Some(tier) = validate_summary_content(&summary.extract) else {
                debug!("Summary for '{}' failed content validation", term);
                return Ok(None);
            };

            Ok(Some(EvidenceItem {
                id: format!("wiki:{}", summary.title.to_lowercase()),
                source: SourceKind::Encyclopedic,
                score: 0.0,
                tier: Some(tier),
                title: summary.title,
                body: summary.extract,
                link: summary.content_urls.map(|u| u.desktop.page),
            }))
        })
    }
}

/// Content-quality validator for encyclopedic summaries
///
/// Returns the quality tier for acceptable content, `None` for content that
/// must be dropped (too short, disambiguation pages, error pages).
pub fn validate_summary_content(text: &str) -> Option<QualityTier> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_SUMMARY_CHARS {
        return None;
    }

    let lowered = trimmed.to_lowercase();
    if REJECT_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return None;
    }

    let len = trimmed.chars().count();
    if len >= HIGH_TIER_CHARS {
        Some(QualityTier::High)
    } else if len >= MEDIUM_TIER_CHARS {
        Some(QualityTier::Medium)
    } else {
        Some(QualityTier::Low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_rejects_short_content() {
        assert!(validate_summary_content("Too short.").is_none());
    }

    #[test]
    fn test_validator_rejects_disambiguation() {
        let text = "Acme may refer to several companies with the same name in various fields.";
        assert!(validate_summary_content(text).is_none());
    }

    #[test]
    fn test_validator_tiers_by_length() {
        let low = "a".repeat(60);
        let medium = "b".repeat(200);
        let high = "c".repeat(500);
        assert_eq!(validate_summary_content(&low), Some(QualityTier::Low));
        assert_eq!(validate_summary_content(&medium), Some(QualityTier::Medium));
        assert_eq!(validate_summary_content(&high), Some(QualityTier::High));
    }
}
