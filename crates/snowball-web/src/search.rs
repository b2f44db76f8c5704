//! Google Custom Search client
//!
//! Issues a query against the Custom Search JSON API and returns the
//! ranked HTML results.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use snowball_core::{Result, SearchConfig, SearchProvider, SearchResult, SnowballError};
use std::time::Duration;

/// Custom Search JSON API client
pub struct GoogleSearch {
    client: Client,
    api_key: String,
    engine_id: String,
    endpoint: String,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Absent when the query has no hits
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    /// Present only on non-HTML documents (PDF, DOC, ...)
    file_format: Option<String>,
}

impl GoogleSearch {
    /// Create a new client
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Result<Self> {
        Self::from_config(api_key, engine_id, &SearchConfig::default())
    }

    /// Create from config
    pub fn from_config(
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        config: &SearchConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                SnowballError::SearchError(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            endpoint: config.endpoint.clone(),
            max_results: config.max_results,
        })
    }

    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }
}

/// Parse a Custom Search response body, dropping non-HTML items
pub fn parse_response(body: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| SnowballError::SearchError(format!("Failed to parse response: {e}")))?;

    let results = response
        .items
        .into_iter()
        .filter(|item| item.file_format.is_none())
        .take(max_results)
        .map(|item| SearchResult {
            url: item.link,
            title: item.title,
            snippet: item.snippet,
        })
        .collect();

    Ok(results)
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
            ])
            .send()
            .await
            .map_err(|e| SnowballError::SearchError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SnowballError::SearchError(format!(
                "Custom Search error ({status}): {error_text}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SnowballError::SearchError(format!("Failed to read response: {e}")))?;

        parse_response(&body, self.max_results)
    }

    fn name(&self) -> &str {
        "google"
    }
}
