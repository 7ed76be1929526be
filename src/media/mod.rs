use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod probe;
pub mod scope;

pub use probe::DurationProbe;
pub use scope::ResourceScope;

use crate::config::Config;
use crate::extractors::youtube::YoutubeExtractor;
use crate::extractors::VideoId;
use crate::{PipelineError, Result};

/// What to download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Full video, capped at the configured height
    Video,
    /// Audio track only
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// A downloaded file together with the scope that owns it
#[derive(Debug)]
pub struct DownloadedMedia {
    /// The media file inside `scope`
    pub path: PathBuf,

    /// Title reported by the platform, when known
    pub title: Option<String>,

    /// Temporary directory holding the file; dropping it removes the file
    pub scope: ResourceScope,
}

/// Anything that can download media for a video into a fresh scope
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self, video_id: &VideoId, kind: MediaKind) -> Result<DownloadedMedia>;
}

/// Downloads video or audio with yt-dlp into per-call temporary directories
pub struct MediaFetcher {
    extractor: YoutubeExtractor,
    max_height: u32,
    temp_root: Option<PathBuf>,
    show_progress: bool,
}

impl MediaFetcher {
    pub fn new(extractor: YoutubeExtractor, max_height: u32, temp_root: Option<PathBuf>) -> Self {
        Self {
            extractor,
            max_height,
            temp_root,
            show_progress: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            YoutubeExtractor::new(&config.tools.yt_dlp, config.download.preferred_client.clone()),
            config.download.max_height,
            config.download.temp_root.clone(),
        )
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// yt-dlp arguments for a download into `dir`
    pub fn download_args(&self, video_id: &VideoId, kind: MediaKind, dir: &Path) -> Vec<OsString> {
        let format = match kind {
            MediaKind::Video => format!("best[height<={h}]/bestvideo[height<={h}]+bestaudio/best", h = self.max_height),
            MediaKind::Audio => "bestaudio/best".to_string(),
        };
        let template = dir.join("%(id)s.%(ext)s");

        vec![
            OsString::from("--format"),
            OsString::from(format),
            OsString::from("--output"),
            template.into_os_string(),
            OsString::from("--no-playlist"),
            OsString::from("--no-part"),
            OsString::from("--no-warnings"),
            OsString::from("--print"),
            OsString::from("after_move:title"),
            OsString::from(video_id.watch_url()),
        ]
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            progress.set_style(style);
        }
        progress.set_message(message);
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }
}

#[async_trait]
impl MediaSource for MediaFetcher {
    async fn fetch(&self, video_id: &VideoId, kind: MediaKind) -> Result<DownloadedMedia> {
        let scope = ResourceScope::create(video_id.as_str(), self.temp_root.as_deref()).map_err(|e| {
            PipelineError::DownloadFailed {
                video_id: video_id.to_string(),
                reason: format!("could not create temporary directory: {}", e),
            }
        })?;

        tracing::info!("Downloading {} for {} to {}", kind.as_str(), video_id, scope.path().display());

        let progress = self.spinner(format!("Downloading {} with yt-dlp...", kind.as_str()));
        let args = self.download_args(video_id, kind, scope.path());
        let result = self.extractor.run_with_fallback(&args).await;
        progress.finish_and_clear();

        // On any error below `scope` is dropped and takes partial files with it
        let output = result.map_err(|e| PipelineError::DownloadFailed {
            video_id: video_id.to_string(),
            reason: format!("{:#}", e),
        })?;

        let path = locate_output(scope.path(), video_id).ok_or_else(|| PipelineError::FileNotFoundAfterDownload {
            video_id: video_id.to_string(),
            dir: scope.path().to_path_buf(),
        })?;

        let title = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && *line != "NA")
            .map(str::to_string);

        tracing::info!("Downloaded {}", path.display());
        Ok(DownloadedMedia { path, title, scope })
    }
}

/// Find the file yt-dlp wrote for `video_id` (named `<id>.<ext>`)
pub fn locate_output(dir: &Path, video_id: &VideoId) -> Option<PathBuf> {
    let prefix = format!("{}.", video_id.as_str());
    let mut candidates: Vec<PathBuf> = fs_err::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(&prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl"))
                .unwrap_or(false)
        })
        .collect();

    candidates.sort();
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::resolve_video_id;
    use tempfile::TempDir;

    fn video_id() -> VideoId {
        resolve_video_id(None, Some("ABCDEFGHIJK")).unwrap()
    }

    #[test]
    fn test_locate_output() {
        let dir = TempDir::new().unwrap();
        assert_eq!(locate_output(dir.path(), &video_id()), None);

        fs_err::write(dir.path().join("ABCDEFGHIJK.mp4.part"), b"partial").unwrap();
        fs_err::write(dir.path().join("other.mp4"), b"other").unwrap();
        assert_eq!(locate_output(dir.path(), &video_id()), None);

        fs_err::write(dir.path().join("ABCDEFGHIJK.mp4"), b"video").unwrap();
        assert_eq!(
            locate_output(dir.path(), &video_id()),
            Some(dir.path().join("ABCDEFGHIJK.mp4"))
        );
    }

    #[test]
    fn test_download_args() {
        let fetcher = MediaFetcher::new(YoutubeExtractor::new("yt-dlp", None), 720, None);
        let dir = Path::new("/tmp/scope");

        let video = fetcher.download_args(&video_id(), MediaKind::Video, dir);
        assert_eq!(video[1], OsString::from("best[height<=720]/bestvideo[height<=720]+bestaudio/best"));
        assert_eq!(video[3], dir.join("%(id)s.%(ext)s").into_os_string());
        assert_eq!(
            video.last().unwrap(),
            &OsString::from("https://www.youtube.com/watch?v=ABCDEFGHIJK")
        );

        let audio = fetcher.download_args(&video_id(), MediaKind::Audio, dir);
        assert_eq!(audio[1], OsString::from("bestaudio/best"));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_nothing_behind() {
        let root = TempDir::new().unwrap();
        let fetcher = MediaFetcher::new(
            YoutubeExtractor::new("/nonexistent/yt-dlp", Some("android".to_string())),
            720,
            Some(root.path().to_path_buf()),
        );

        let err = fetcher.fetch(&video_id(), MediaKind::Audio).await.unwrap_err();
        assert!(matches!(err, PipelineError::DownloadFailed { .. }));
        assert_eq!(fs_err::read_dir(root.path()).unwrap().count(), 0);
    }
}
