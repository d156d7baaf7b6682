//! Watch-page transcript fetcher
//!
//! Primary extraction stage. Caption tracks are discovered from the player
//! response embedded in the public watch page, the best track is chosen by
//! language priority, and its content is fetched in the `json3` timed-text
//! format.
//!
//! All I/O happens inside the returned future; dropping it (deadline or
//! cancellation in the acquirer) aborts the in-flight request.

use async_trait::async_trait;
use rq_common::events::TranscriptSegment;
use serde::Deserialize;
use std::time::Duration;

use super::identity::ClientIdentity;
use crate::types::{FetchError, TranscriptFetcher};

const CAPTION_TRACKS_KEY: &str = "\"captionTracks\":";

/// Caption track advertised by the player response
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// "asr" for auto-generated tracks, absent for authored ones
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    #[serde(default)]
    t_start_ms: Option<f64>,
    #[serde(default)]
    segs: Option<Vec<TimedTextSeg>>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Deserialize the caption track array that follows the tracks key
///
/// `None` when the key is missing or is not followed by an array.
fn tracks_after_key(page: &str) -> Option<Result<Vec<CaptionTrack>, serde_json::Error>> {
    let after_key = page.find(CAPTION_TRACKS_KEY)? + CAPTION_TRACKS_KEY.len();
    let rest = page[after_key..].trim_start();
    if !rest.starts_with('[') {
        return None;
    }

    // The array is followed by the rest of the page, so only the first value is read
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
}

/// Parse caption tracks out of a watch page
pub fn parse_caption_tracks(page: &str) -> Result<Vec<CaptionTrack>, FetchError> {
    let Some(parsed) = tracks_after_key(page) else {
        if page.contains("g-recaptcha") || page.contains("consent.youtube.com") {
            return Err(FetchError::Blocked(429));
        }
        return Err(FetchError::NoCaptionTracks);
    };

    let tracks = parsed.map_err(|e| FetchError::Parse(e.to_string()))?;

    if tracks.is_empty() {
        return Err(FetchError::NoCaptionTracks);
    }
    Ok(tracks)
}

/// Choose the first track matching `languages` in priority order
///
/// Within one language an authored track beats an auto-generated one.
/// Language codes match exactly or by primary subtag ("en" matches "en-GB").
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|lang| {
        let matching = || {
            tracks.iter().filter(move |t| {
                t.language_code == *lang
                    || t.language_code
                        .split('-')
                        .next()
                        .is_some_and(|primary| primary == lang.as_str())
            })
        };
        matching()
            .find(|t| !t.is_generated())
            .or_else(|| matching().next())
    })
}

/// Convert `json3` timed text into ordered segments, dropping empty cues
pub fn parse_timed_text(body: &str) -> Result<Vec<TranscriptSegment>, FetchError> {
    let timed: TimedText = serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let mut segments: Vec<TranscriptSegment> = timed
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs?.into_iter().map(|s| s.utf8).collect();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }
            let start = event.t_start_ms.unwrap_or(0.0) / 1000.0;
            Some(TranscriptSegment::new(start, text))
        })
        .collect();

    if segments.is_empty() {
        return Err(FetchError::EmptyTranscript);
    }

    segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    Ok(segments)
}

fn status_error(status: reqwest::StatusCode) -> FetchError {
    match status.as_u16() {
        code @ (403 | 429) => FetchError::Blocked(code),
        code => FetchError::Http(code),
    }
}

/// Transcript fetcher backed by the public watch page
pub struct WatchPageTranscriptFetcher {
    http_client: reqwest::Client,
    watch_base_url: String,
}

impl WatchPageTranscriptFetcher {
    pub fn new(watch_base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            watch_base_url: watch_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
        identity: &ClientIdentity,
    ) -> Result<String, FetchError> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .header(reqwest::header::USER_AGENT, identity.user_agent.as_str())
            .header(reqwest::header::ACCEPT_LANGUAGE, identity.accept_language.as_str())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

#[async_trait]
impl TranscriptFetcher for WatchPageTranscriptFetcher {
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
        identity: &ClientIdentity,
    ) -> Result<Vec<TranscriptSegment>, FetchError> {
        let watch_url = format!("{}/watch", self.watch_base_url);
        let page = self
            .get_text(&watch_url, &[("v", video_id), ("hl", "en")], identity)
            .await?;

        let tracks = parse_caption_tracks(&page)?;
        let track = select_track(&tracks, languages)
            .ok_or_else(|| FetchError::LanguageUnavailable(languages.to_vec()))?;

        tracing::debug!(
            video_id = %video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "Caption track selected"
        );

        let body = self
            .get_text(&track.base_url, &[("fmt", "json3")], identity)
            .await?;

        parse_timed_text(&body)
    }
}
