//! Streaming response handling

use std::pin::Pin;

use futures::Stream;

use crate::errors::Result;

/// Streaming response from the generation capability
pub struct StreamingResponse {
    stream: Pin<Box<dyn Stream<Item = Result<String>> + Send>>,
}

impl StreamingResponse {
    pub fn new(stream: Pin<Box<dyn Stream<Item = Result<String>> + Send>>) -> Self {
        Self { stream }
    }

    /// Wrap an already-materialized answer as a chunked stream
    pub fn from_chunks(chunks: Vec<String>) -> Self {
        let stream = futures::stream::iter(chunks.into_iter().map(Ok));
        Self::new(Box::pin(stream))
    }

    /// Collect all chunks into a single string
    pub async fn collect_all(mut self) -> Result<String> {
        use futures::StreamExt;
        let mut result = String::new();
        while let Some(chunk) = self.stream.next().await {
            result.push_str(&chunk?);
        }
        Ok(result)
    }

    /// Get the underlying stream
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = Result<String>> + Send>> {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_chunks_collects_in_order() {
        let response = StreamingResponse::from_chunks(vec![
            "The ".to_string(),
            "answer".to_string(),
            ".".to_string(),
        ]);
        assert_eq!(response.collect_all().await.unwrap(), "The answer.");
    }
}
