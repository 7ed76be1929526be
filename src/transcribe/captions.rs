use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::TranscriptSegment;
use crate::extractors::youtube::YoutubeExtractor;
use crate::extractors::VideoId;

/// Who authored a caption track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Uploaded by the video owner
    Manual,
    /// Produced by the platform's speech recognition
    Generated,
}

/// A caption track offered for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub language: String,
    pub name: Option<String>,
    pub kind: TrackKind,
    /// json3 timedtext URL
    pub url: String,
}

/// Caption tracks for a video, in the order the platform lists them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionListing {
    pub title: Option<String>,
    pub tracks: Vec<CaptionTrack>,
}

/// Lists, fetches and translates caption tracks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn list_tracks(&self, video_id: &VideoId) -> anyhow::Result<CaptionListing>;

    async fn fetch(&self, track: &CaptionTrack) -> anyhow::Result<Vec<TranscriptSegment>>;

    async fn fetch_translated(
        &self,
        track: &CaptionTrack,
        target_language: &str,
    ) -> anyhow::Result<Vec<TranscriptSegment>>;
}

/// Caption provider reading track lists from yt-dlp and timedtext from YouTube
pub struct YoutubeCaptions {
    extractor: YoutubeExtractor,
    client: reqwest::Client,
}

impl YoutubeCaptions {
    pub fn new(extractor: YoutubeExtractor, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { extractor, client })
    }

    async fn download(&self, url: &str) -> anyhow::Result<Vec<TranscriptSegment>> {
        let response = self.client.get(url).send().await.context("Failed to request caption track")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download caption track: HTTP {}", response.status());
        }

        let body = response.text().await.context("Failed to read caption track")?;
        parse_json3(&body)
    }
}

#[async_trait]
impl CaptionProvider for YoutubeCaptions {
    async fn list_tracks(&self, video_id: &VideoId) -> anyhow::Result<CaptionListing> {
        let info = self.extractor.video_info(video_id).await?;
        let listing = listing_from_info(&info);
        tracing::debug!(
            "Video {} offers {} caption tracks: {:?}",
            video_id,
            listing.tracks.len(),
            listing.tracks.iter().map(|t| (&t.language, t.kind)).collect::<Vec<_>>()
        );
        Ok(listing)
    }

    async fn fetch(&self, track: &CaptionTrack) -> anyhow::Result<Vec<TranscriptSegment>> {
        self.download(&track.url).await
    }

    async fn fetch_translated(
        &self,
        track: &CaptionTrack,
        target_language: &str,
    ) -> anyhow::Result<Vec<TranscriptSegment>> {
        self.download(&translated_url(&track.url, target_language)).await
    }
}

/// Build the listing from yt-dlp's `--dump-json` output
pub fn listing_from_info(info: &Value) -> CaptionListing {
    let mut tracks = Vec::new();
    collect_tracks(info.get("subtitles"), TrackKind::Manual, &mut tracks);
    collect_tracks(info.get("automatic_captions"), TrackKind::Generated, &mut tracks);

    CaptionListing {
        title: info["title"].as_str().map(|s| s.to_string()),
        tracks,
    }
}

fn collect_tracks(map: Option<&Value>, kind: TrackKind, tracks: &mut Vec<CaptionTrack>) {
    let Some(map) = map.and_then(Value::as_object) else {
        return;
    };

    for (language, formats) in map {
        if language == "live_chat" {
            continue;
        }
        let Some(json3) = formats
            .as_array()
            .and_then(|formats| formats.iter().find(|f| f["ext"] == "json3"))
        else {
            continue;
        };
        let Some(url) = json3["url"].as_str() else {
            continue;
        };
        // Generated lists also carry machine translations of the original track
        if kind == TrackKind::Generated && url.contains("tlang=") {
            continue;
        }

        tracks.push(CaptionTrack {
            language: language.clone(),
            name: json3["name"].as_str().map(|s| s.to_string()),
            kind,
            url: url.to_string(),
        });
    }
}

fn translated_url(url: &str, target_language: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}tlang={}", url, separator, urlencoding::encode(target_language))
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    t_start_ms: Option<i64>,
    d_duration_ms: Option<i64>,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a json3 timedtext document into segments, keeping document order
pub fn parse_json3(body: &str) -> anyhow::Result<Vec<TranscriptSegment>> {
    let document: Json3 = serde_json::from_str(body).context("Failed to parse caption track")?;

    let segments = document
        .events
        .into_iter()
        .filter_map(|event| {
            let raw: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }
            let start = event.t_start_ms.unwrap_or(0).max(0) as f64 / 1000.0;
            let duration = event.d_duration_ms.unwrap_or(0).max(0) as f64 / 1000.0;
            Some(TranscriptSegment::new(start, duration, text))
        })
        .collect();

    Ok(segments)
}
