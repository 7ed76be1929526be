use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use url::Url;

pub mod youtube;

use crate::{PipelineError, Result};

/// A resolved YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn id_grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("identifier grammar is valid"))
}

/// Resolve a video identifier from an explicit id or a URL.
///
/// An explicit id wins and is only sanitized; a URL must match one of the known
/// watch, short-link or embed forms.
pub fn resolve_video_id(url: Option<&str>, explicit_id: Option<&str>) -> Result<VideoId> {
    if let Some(id) = explicit_id {
        let sanitized = sanitize_id(id);
        if sanitized.is_empty() {
            return Err(PipelineError::InvalidReference(format!(
                "video id {:?} contains no usable characters",
                id
            )));
        }
        return Ok(VideoId(sanitized));
    }

    let url = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| PipelineError::InvalidReference("no URL or video id supplied".to_string()))?;

    id_from_url(url)
        .map(VideoId)
        .ok_or_else(|| PipelineError::InvalidReference(format!("could not extract a video id from {}", url)))
}

/// Strip everything outside the identifier alphabet
fn sanitize_id(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn id_from_url(input: &str) -> Option<String> {
    let parsed = validate_url(input).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("music."))
        .unwrap_or(&host);

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => match segments.next() {
            Some("watch") => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed" | "v" | "shorts" | "live") => segments.next().map(str::to_string),
            _ => None,
        },
        _ => None,
    }?;

    // Only the leading 11 characters belong to the id ("ID&t=10" style suffixes are dropped)
    let candidate: String = candidate.chars().take(11).collect();
    id_grammar().is_match(&candidate).then_some(candidate)
}

/// Validate and normalize URLs, assuming https when no scheme is given
pub fn validate_url(url: &str) -> anyhow::Result<Url> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", url))
            .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?,
        Err(_) => anyhow::bail!("Invalid URL format: {}", url),
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_reference_forms_resolve_to_same_id() {
        let watch = resolve_video_id(Some("https://www.youtube.com/watch?v=ABCDEFGHIJK"), None).unwrap();
        let short = resolve_video_id(Some("https://youtu.be/ABCDEFGHIJK"), None).unwrap();
        let explicit = resolve_video_id(None, Some("ABCDEFGHIJK")).unwrap();

        assert_eq!(watch.as_str(), "ABCDEFGHIJK");
        assert_eq!(watch, short);
        assert_eq!(short, explicit);
    }

    #[test]
    fn test_embed_shorts_and_query_order() {
        let cases = [
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
        ];
        for case in cases {
            let id = resolve_video_id(Some(case), None).unwrap();
            assert_eq!(id.as_str(), "dQw4w9WgXcQ", "failed for {}", case);
        }
    }

    #[test]
    fn test_explicit_id_wins_and_is_sanitized() {
        let id = resolve_video_id(Some("https://youtu.be/AAAAAAAAAAA"), Some(" abc<def>123 ")).unwrap();
        assert_eq!(id.as_str(), "abcdef123");
    }

    #[test]
    fn test_invalid_references() {
        assert!(matches!(
            resolve_video_id(None, None),
            Err(PipelineError::InvalidReference(_))
        ));
        assert!(matches!(
            resolve_video_id(Some("https://vimeo.com/12345678"), None),
            Err(PipelineError::InvalidReference(_))
        ));
        assert!(matches!(
            resolve_video_id(Some("https://www.youtube.com/watch?v=short"), None),
            Err(PipelineError::InvalidReference(_))
        ));
        assert!(matches!(
            resolve_video_id(None, Some("<>!?")),
            Err(PipelineError::InvalidReference(_))
        ));
        assert!(matches!(
            resolve_video_id(Some("ftp://youtube.com/watch?v=ABCDEFGHIJK"), None),
            Err(PipelineError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_watch_url() {
        let id = resolve_video_id(None, Some("ABCDEFGHIJK")).unwrap();
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=ABCDEFGHIJK");
    }
}
