//! YouTube Data API search client
//!
//! Discovery stage of the pipeline: turns a research query into an ordered
//! list of candidate videos via `GET {api_base}/search`.

use async_trait::async_trait;
use rq_common::events::CandidateVideo;
use serde::Deserialize;
use std::time::Duration;

use crate::types::{CandidateSource, SearchError};

/// Search API response (only the fields the pipeline reads)
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// Individual search result
#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: Option<SearchItemId>,
    pub snippet: Option<SearchSnippet>,
}

/// Result identifier; `video_id` is absent for channel/playlist hits
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemId {
    pub video_id: Option<String>,
}

/// High-level video metadata
#[derive(Debug, Deserialize)]
pub struct SearchSnippet {
    #[serde(default)]
    pub title: String,
}

impl SearchResponse {
    /// Candidates in API order, skipping results without a video id
    pub fn into_candidates(self) -> Vec<CandidateVideo> {
        self.items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id?.video_id.filter(|id| !id.is_empty())?;
                let title = item.snippet.map(|s| s.title).unwrap_or_default();
                Some(CandidateVideo::new(video_id, title))
            })
            .collect()
    }
}

/// YouTube Data API v3 search client
pub struct YouTubeSearchClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl YouTubeSearchClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl CandidateSource for YouTubeSearchClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<CandidateVideo>, SearchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SearchError::Config("YouTube API key not configured".to_string()))?;

        tracing::info!(query = %query, max_results, "Initiating YouTube search");

        let url = format!("{}/search", self.base_url);
        let max_results = max_results.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("key", api_key),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "YouTube search API error");
            return Err(SearchError::Api(status.as_u16(), error_text));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        let candidates = body.into_candidates();
        tracing::info!(
            query = %query,
            found = candidates.len(),
            "Discovered video sources"
        );

        Ok(candidates)
    }
}
