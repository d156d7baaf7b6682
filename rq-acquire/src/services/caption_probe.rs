//! Caption capability probe
//!
//! Asks the Data API `captions` endpoint whether a video lists any caption
//! tracks before the expensive scrape is attempted. The probe only saves
//! cost: anything other than a clean "no tracks" answer reports `Unknown`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::types::{CaptionProbe, ProbeOutcome};

#[derive(Debug, Deserialize)]
struct CaptionListResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Interpret a captions list body
fn outcome_from_body(body: &str) -> ProbeOutcome {
    match serde_json::from_str::<CaptionListResponse>(body) {
        Ok(list) if list.items.is_empty() => ProbeOutcome::NoCaptions,
        Ok(_) => ProbeOutcome::HasCaptions,
        Err(_) => ProbeOutcome::Unknown,
    }
}

/// Data API caption metadata probe
pub struct YouTubeCaptionProbe {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl YouTubeCaptionProbe {
    /// Never fails: if the configured client cannot be built, a default
    /// client is used instead.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Caption probe client build failed, using defaults");
                reqwest::Client::new()
            });

        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl CaptionProbe for YouTubeCaptionProbe {
    async fn probe(&self, video_id: &str) -> ProbeOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!(video_id = %video_id, "Caption probe skipped: no API key");
            return ProbeOutcome::Unknown;
        };

        tracing::info!(video_id = %video_id, "Validating caption tracks");

        let url = format!("{}/captions", self.base_url);
        let response = match self
            .http_client
            .get(&url)
            .query(&[("part", "snippet"), ("videoId", video_id), ("key", api_key)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(video_id = %video_id, error = %e, "Caption probe failed");
                return ProbeOutcome::Unknown;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(video_id = %video_id, status = %status, "Caption probe rejected");
            return ProbeOutcome::Unknown;
        }

        match response.text().await {
            Ok(body) => outcome_from_body(&body),
            Err(e) => {
                tracing::warn!(video_id = %video_id, error = %e, "Caption probe body unreadable");
                ProbeOutcome::Unknown
            }
        }
    }
}
