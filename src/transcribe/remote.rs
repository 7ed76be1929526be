use async_trait::async_trait;

use super::TranscriptSegment;
use crate::extractors::VideoId;

/// Captions fetched through a remote captioning API
#[derive(Debug, Clone)]
pub struct RemoteCaptions {
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
}

/// A remote captioning service used after the public caption tracks are exhausted
#[async_trait]
pub trait RemoteCaptionSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the service has nothing for this video
    async fn fetch(&self, video_id: &VideoId, languages: &[String]) -> anyhow::Result<Option<RemoteCaptions>>;
}

/// YouTube Data API `captions.download`
///
/// Downloading caption bodies needs an OAuth flow on behalf of the channel owner,
/// so with an API key alone this source always reports that nothing is available.
pub struct DataApiCaptions {
    _api_key: String,
}

impl DataApiCaptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            _api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for DataApiCaptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataApiCaptions").field("api_key", &"<redacted>").finish()
    }
}

#[async_trait]
impl RemoteCaptionSource for DataApiCaptions {
    fn name(&self) -> &'static str {
        "YouTube Data API"
    }

    async fn fetch(&self, video_id: &VideoId, _languages: &[String]) -> anyhow::Result<Option<RemoteCaptions>> {
        // TODO: implement the OAuth 2.0 consent flow required by captions.download
        tracing::warn!("{} captions for {} are not implemented; skipping", self.name(), video_id);
        Ok(None)
    }
}
