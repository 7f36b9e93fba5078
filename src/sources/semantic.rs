//! Semantic retrieval over an HTTP vector index

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::EvidenceItem;
use super::SemanticSource;
use super::SourceKind;
use crate::embeddings::EmbeddingClient;
use crate::errors::Result;
use crate::errors::WealthRagError;

/// Vector-index-backed semantic source
///
/// Embeds the query text, then asks the index for the nearest neighbors.
/// The exclusion filter is applied both server-side (as a query filter) and
/// client-side on the returned entity metadata, so a stale index cannot
/// resurface an excluded entity.
pub struct HttpSemanticSource {
    embeddings: Arc<EmbeddingClient>,
    endpoint: String,
    client: Client,
}

impl HttpSemanticSource {
    pub fn new(embeddings: Arc<EmbeddingClient>, endpoint: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| WealthRagError::Http(e.to_string()))?;

        Ok(Self {
            embeddings,
            endpoint,
            client,
        })
    }

    async fn query_index(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        exclude_entities: &[String],
    ) -> Result<Vec<IndexMatch>> {
        #[derive(Serialize)]
        struct IndexQuery<'a> {
            vector: Vec<f32>,
            top_k: usize,
            #[serde(skip_serializing_if = "Option::is_none")]
            filter: Option<IndexFilter<'a>>,
        }

        #[derive(Serialize)]
        struct IndexFilter<'a> {
            exclude_entities: &'a [String],
        }

        #[derive(Deserialize)]
        struct IndexResponse {
            matches: Vec<IndexMatch>,
        }

        let url = format!("{}/query", self.endpoint);
        debug!("Querying vector index: {} (top_k: {})", url, top_k);

        let request = IndexQuery {
            vector,
            top_k,
            filter: if exclude_entities.is_empty() {
                None
            } else {
                Some(IndexFilter { exclude_entities })
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| WealthRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(WealthRagError::SourceUnavailable(format!(
                "Vector index error ({status})"
            )));
        }

        let result: IndexResponse = response.json().await.map_err(|e| {
            WealthRagError::SourceUnavailable(format!("Failed to parse index response: {e}"))
        })?;

        Ok(result.matches)
    }
}

#[derive(Debug, Deserialize)]
struct IndexMatch {
    id: String,
    score: f32,
    metadata: MatchMetadata,
}

#[derive(Debug, Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    link: Option<String>,
    /// Primary entity the indexed document is about, when known
    #[serde(default)]
    entity: Option<String>,
}

impl SemanticSource for HttpSemanticSource {
    fn query<'a>(
        &'a self,
        query: &'a str,
        top_k: usize,
        min_score: f32,
        exclude_entities: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<EvidenceItem>>> {
        Box::pin(async move {
            let vector = self.embeddings.generate(query).await?;
            let matches = self.query_index(vector, top_k, exclude_entities).await?;

            let items = matches
                .into_iter()
                .filter(|m| m.score >= min_score)
                .filter(|m| !is_excluded(m.metadata.entity.as_deref(), exclude_entities))
                .map(|m| EvidenceItem {
                    id: m.id,
                    source: SourceKind::Semantic,
                    score: m.score,
                    tier: None,
                    title: m.metadata.title,
                    body: m.metadata.summary,
                    link: m.metadata.link,
                })
                .collect();

            Ok(items)
        })
    }
}

/// Case-insensitive entity exclusion check
fn is_excluded(entity: Option<&str>, exclude_entities: &[String]) -> bool {
    let Some(entity) = entity else {
        return false;
    };
    let entity = entity.to_lowercase();
    exclude_entities
        .iter()
        .any(|excluded| excluded.to_lowercase() == entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_excluded_case_insensitive() {
        let excluded = vec!["Jane Doe".to_string()];
        assert!(is_excluded(Some("jane doe"), &excluded));
        assert!(is_excluded(Some("Jane Doe"), &excluded));
        assert!(!is_excluded(Some("John Smith"), &excluded));
    }

    #[test]
    fn test_untagged_items_never_excluded() {
        let excluded = vec!["Jane Doe".to_string()];
        assert!(!is_excluded(None, &excluded));
    }
}
