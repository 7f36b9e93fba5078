//! General web search source

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::EvidenceItem;
use super::SourceKind;
use super::WebSearchSource;
use crate::errors::Result;
use crate::errors::WealthRagError;

/// Web search over a JSON search API
pub struct HttpWebSearchSource {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpWebSearchSource {
    pub fn new(endpoint: String, api_key: Option<String>) -> Result<Self> {
        Url::parse(&endpoint)
            .map_err(|e| WealthRagError::Config(format!("Invalid web search endpoint: {e}")))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .map_err(|e| WealthRagError::Http(e.to_string()))?;

        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }
}

impl WebSearchSource for HttpWebSearchSource {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<EvidenceItem>>> {
        Box::pin(async move {
            #[derive(Deserialize)]
            struct SearchResponse {
                #[serde(default)]
                results: Vec<SearchHit>,
            }

            #[derive(Deserialize)]
            struct SearchHit {
                title: String,
                link: String,
                #[serde(default)]
                snippet: String,
            }

            debug!("Searching web: {}", query);

            let mut builder = self.client.get(&self.endpoint).query(&[("q", query)]);
            if let Some(key) = &self.api_key {
                builder = builder.header("X-Api-Key", key);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| WealthRagError::Http(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                return Err(WealthRagError::SourceUnavailable(format!(
                    "Web search error ({status})"
                )));
            }

            let result: SearchResponse = response.json().await.map_err(|e| {
                WealthRagError::SourceUnavailable(format!("Failed to parse search response: {e}"))
            })?;

            let total = result.results.len();
            let items = result
                .results
                .into_iter()
                .enumerate()
                .map(|(idx, hit)| EvidenceItem {
                    id: hit.link.clone(),
                    source: SourceKind::WebSearch,
                    // Decreasing score based on rank
                    score: 1.0 - (idx as f32 / total.max(1) as f32),
                    tier: None,
                    title: hit.title,
                    body: hit.snippet,
                    link: Some(hit.link),
                })
                .collect();

            Ok(items)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(HttpWebSearchSource::new("not a url".to_string(), None).is_err());
    }
}
