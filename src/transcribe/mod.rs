use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod captions;
pub mod remote;
pub mod stt;

use crate::extractors::VideoId;
use crate::media::{MediaKind, MediaSource};
use crate::{PipelineError, Result};
use captions::{CaptionListing, CaptionProvider, CaptionTrack, TrackKind};
use remote::RemoteCaptionSource;
use stt::SpeechToText;

/// Individual transcript segment with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,

    /// Segment text
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, duration: f64, text: impl Into<String>) -> Self {
        Self {
            start: start.max(0.0),
            duration: duration.max(0.0),
            text: text.into(),
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Which acquisition tier produced a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptSource {
    ManualCaptions,
    AutoCaptions,
    RemoteApi,
    SpeechToText,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptSource::ManualCaptions => "manual-captions",
            TranscriptSource::AutoCaptions => "auto-captions",
            TranscriptSource::RemoteApi => "remote-api",
            TranscriptSource::SpeechToText => "speech-to-text",
        }
    }
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete transcript; immutable once built
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    video_id: VideoId,
    title: Option<String>,
    language: String,
    segments: Vec<TranscriptSegment>,
    total_duration: f64,
    source: TranscriptSource,
    completed_at: chrono::DateTime<chrono::Utc>,
}

impl Transcript {
    /// Build a transcript. Segments end up ordered by start time and the total
    /// duration is the furthest segment end.
    pub fn new(
        video_id: VideoId,
        title: Option<String>,
        language: impl Into<String>,
        mut segments: Vec<TranscriptSegment>,
        source: TranscriptSource,
    ) -> Self {
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        let total_duration = segments.iter().map(TranscriptSegment::end).fold(0.0, f64::max);

        Self {
            video_id,
            title,
            language: language.into(),
            segments,
            total_duration,
            source,
            completed_at: chrono::Utc::now(),
        }
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn source(&self) -> TranscriptSource {
        self.source
    }

    pub fn completed_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.completed_at
    }

    /// Segment texts joined with spaces
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parameters of a transcript request
#[derive(Debug, Clone, Default)]
pub struct TranscriptRequest {
    pub url: Option<String>,
    pub video_id: Option<String>,
    /// Preferred caption languages, first match wins
    pub languages: Vec<String>,
    pub translate_to: Option<String>,
    pub allow_remote_api: bool,
    pub allow_stt_fallback: bool,
}

impl TranscriptRequest {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// Acquisition tiers in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    ManualCaptions,
    AutoCaptions,
    AnyCaptions,
    RemoteApi,
    SpeechToText,
}

impl Tier {
    /// Tiers enabled for a request
    pub fn plan(request: &TranscriptRequest) -> Vec<Tier> {
        let mut tiers = vec![Tier::ManualCaptions, Tier::AutoCaptions, Tier::AnyCaptions];
        if request.allow_remote_api {
            tiers.push(Tier::RemoteApi);
        }
        if request.allow_stt_fallback {
            tiers.push(Tier::SpeechToText);
        }
        tiers
    }
}

/// Pick the caption track a caption tier would use; language matching is exact
pub fn select_track<'a>(tracks: &'a [CaptionTrack], tier: Tier, languages: &[String]) -> Option<&'a CaptionTrack> {
    let by_kind = |kind: TrackKind| {
        languages
            .iter()
            .find_map(|lang| tracks.iter().find(|t| t.kind == kind && &t.language == lang))
    };

    match tier {
        Tier::ManualCaptions => by_kind(TrackKind::Manual),
        Tier::AutoCaptions => by_kind(TrackKind::Generated),
        Tier::AnyCaptions => tracks.first(),
        Tier::RemoteApi | Tier::SpeechToText => None,
    }
}

/// Caption listing fetched at most once per acquisition
type ListingCache = Option<Option<CaptionListing>>;

/// Tiered transcript acquisition
pub struct TranscriptAcquirer {
    captions: Arc<dyn CaptionProvider>,
    media: Arc<dyn MediaSource>,
    remote: Option<Arc<dyn RemoteCaptionSource>>,
    speech: Option<Arc<dyn SpeechToText>>,
    speech_language_hint: Option<String>,
}

impl TranscriptAcquirer {
    pub fn new(captions: Arc<dyn CaptionProvider>, media: Arc<dyn MediaSource>) -> Self {
        Self {
            captions,
            media,
            remote: None,
            speech: None,
            speech_language_hint: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteCaptionSource>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechToText>, language_hint: Option<String>) -> Self {
        self.speech = Some(speech);
        self.speech_language_hint = language_hint;
        self
    }

    /// Walk the enabled tiers until one yields a non-empty transcript
    pub async fn acquire(&self, video_id: &VideoId, request: &TranscriptRequest) -> Result<Transcript> {
        let mut listing: ListingCache = None;

        for tier in Tier::plan(request) {
            let attempt = match tier {
                Tier::ManualCaptions | Tier::AutoCaptions | Tier::AnyCaptions => {
                    self.caption_tier(tier, video_id, request, &mut listing).await
                }
                Tier::RemoteApi => self.remote_tier(video_id, request, &listing).await,
                Tier::SpeechToText => self.speech_tier(video_id, &listing).await,
            };

            match attempt {
                Ok(Some(transcript)) => {
                    tracing::info!(
                        "Transcript for {} acquired via {:?} ({} segments, source {})",
                        video_id,
                        tier,
                        transcript.segments().len(),
                        transcript.source()
                    );
                    return Ok(transcript);
                }
                Ok(None) => tracing::debug!("Tier {:?} yielded nothing for {}", tier, video_id),
                Err(e) => tracing::warn!("Tier {:?} failed for {}: {:#}", tier, video_id, e),
            }
        }

        Err(PipelineError::TranscriptUnavailable {
            video_id: video_id.to_string(),
        })
    }

    async fn caption_tier(
        &self,
        tier: Tier,
        video_id: &VideoId,
        request: &TranscriptRequest,
        cache: &mut ListingCache,
    ) -> anyhow::Result<Option<Transcript>> {
        if cache.is_none() {
            let fetched = match self.captions.list_tracks(video_id).await {
                Ok(listing) => Some(listing),
                Err(e) => {
                    tracing::warn!("Could not list caption tracks for {}: {:#}", video_id, e);
                    None
                }
            };
            *cache = Some(fetched);
        }
        let Some(Some(listing)) = cache.as_ref() else {
            return Ok(None);
        };

        let default_languages = ["en".to_string()];
        let languages = if request.languages.is_empty() {
            &default_languages[..]
        } else {
            &request.languages[..]
        };

        let Some(track) = select_track(&listing.tracks, tier, languages) else {
            return Ok(None);
        };

        let (language, segments) = self.fetch_track(track, request.translate_to.as_deref()).await?;
        if segments.is_empty() {
            return Ok(None);
        }

        let source = match track.kind {
            TrackKind::Manual => TranscriptSource::ManualCaptions,
            TrackKind::Generated => TranscriptSource::AutoCaptions,
        };

        Ok(Some(Transcript::new(
            video_id.clone(),
            listing.title.clone(),
            language,
            segments,
            source,
        )))
    }

    /// Fetch a track, translated when asked; a failed translation falls back to the original
    async fn fetch_track(
        &self,
        track: &CaptionTrack,
        translate_to: Option<&str>,
    ) -> anyhow::Result<(String, Vec<TranscriptSegment>)> {
        if let Some(target) = translate_to.filter(|target| *target != track.language) {
            match self.captions.fetch_translated(track, target).await {
                Ok(segments) if !segments.is_empty() => return Ok((target.to_string(), segments)),
                Ok(_) => tracing::warn!(
                    "Translation of {} captions to {} was empty; using the original",
                    track.language,
                    target
                ),
                Err(e) => tracing::warn!(
                    "Translation of {} captions to {} failed; using the original: {:#}",
                    track.language,
                    target,
                    e
                ),
            }
        }

        let segments = self.captions.fetch(track).await?;
        Ok((track.language.clone(), segments))
    }

    async fn remote_tier(
        &self,
        video_id: &VideoId,
        request: &TranscriptRequest,
        cache: &ListingCache,
    ) -> anyhow::Result<Option<Transcript>> {
        let Some(remote) = &self.remote else {
            tracing::debug!("No remote captioning API configured");
            return Ok(None);
        };

        let Some(captions) = remote.fetch(video_id, &request.languages).await? else {
            return Ok(None);
        };
        if captions.segments.is_empty() {
            return Ok(None);
        }

        Ok(Some(Transcript::new(
            video_id.clone(),
            listed_title(cache),
            captions.language,
            captions.segments,
            TranscriptSource::RemoteApi,
        )))
    }

    async fn speech_tier(&self, video_id: &VideoId, cache: &ListingCache) -> anyhow::Result<Option<Transcript>> {
        let Some(speech) = &self.speech else {
            tracing::warn!("Speech-to-text fallback requested but no engine is configured");
            return Ok(None);
        };

        let media = self.media.fetch(video_id, MediaKind::Audio).await?;
        let outcome = speech
            .transcribe(&media.path, self.speech_language_hint.as_deref())
            .await;
        let title = media.title.clone().or_else(|| listed_title(cache));
        media.scope.close();

        let speech_transcript = outcome?;
        let segments = stt::to_transcript_segments(speech_transcript.segments);
        if segments.is_empty() {
            return Ok(None);
        }

        Ok(Some(Transcript::new(
            video_id.clone(),
            title,
            speech_transcript.language,
            segments,
            TranscriptSource::SpeechToText,
        )))
    }
}

fn listed_title(cache: &ListingCache) -> Option<String> {
    cache
        .as_ref()
        .and_then(Option::as_ref)
        .and_then(|listing| listing.title.clone())
}
