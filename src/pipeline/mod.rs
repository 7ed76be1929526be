use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::extractors::youtube::YoutubeExtractor;
use crate::extractors::{resolve_video_id, VideoId};
use crate::frames::{
    self, build_archive, interval_timestamps, scene_timestamps, ExtractionResult, FfmpegSceneDetector,
    FrameExtraction, FrameGrabber, FrameMethod, FrameOutput, FrameRecord, FramesRequest, SceneDetector,
};
use crate::media::{DownloadedMedia, DurationProbe, MediaFetcher, MediaKind, MediaSource};
use crate::transcribe::captions::YoutubeCaptions;
use crate::transcribe::remote::DataApiCaptions;
use crate::transcribe::stt::SpeechToText;
use crate::transcribe::{Transcript, TranscriptAcquirer, TranscriptRequest};
use crate::{PipelineError, Result};

/// Entry point for transcript and frame requests.
///
/// Each call is an independent unit of work with its own temporary directory, so one
/// `Pipeline` can serve concurrent requests.
pub struct Pipeline {
    config: Config,
    media: Arc<dyn MediaSource>,
    probe: DurationProbe,
    grabber: FrameGrabber,
    scenes: Arc<dyn SceneDetector>,
    transcripts: TranscriptAcquirer,
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new(config: Config, show_progress: bool) -> anyhow::Result<Self> {
        let extractor = YoutubeExtractor::new(&config.tools.yt_dlp, config.download.preferred_client.clone());
        let media: Arc<dyn MediaSource> = Arc::new(MediaFetcher::from_config(&config).with_progress(show_progress));

        let captions = YoutubeCaptions::new(
            extractor,
            Duration::from_secs(config.transcript.request_timeout_seconds),
        )?;
        let mut transcripts = TranscriptAcquirer::new(Arc::new(captions), Arc::clone(&media));
        if let Some(key) = &config.transcript.remote_api_key {
            transcripts = transcripts.with_remote(Arc::new(DataApiCaptions::new(key.clone())));
        }
        if let Some(engine) = speech_engine(&config) {
            transcripts = transcripts.with_speech(engine, config.transcript.stt.language_hint.clone());
        }

        Ok(Self {
            probe: DurationProbe::new(&config.tools.ffprobe),
            grabber: FrameGrabber::new(&config.tools.ffmpeg, config.frames.jpeg_quality).with_progress(show_progress),
            scenes: Arc::new(FfmpegSceneDetector::new(&config.tools.ffmpeg, config.frames.min_scene_length)),
            media,
            transcripts,
            config,
        })
    }

    /// Replace the scene detector
    pub fn with_scene_detector(mut self, scenes: Arc<dyn SceneDetector>) -> Self {
        self.scenes = scenes;
        self
    }

    /// Acquire a transcript through the tiered fallback chain
    pub async fn resolve_transcript(&self, request: &TranscriptRequest) -> Result<Transcript> {
        let video_id = resolve_video_id(request.url.as_deref(), request.video_id.as_deref())?;
        tracing::info!("Resolving transcript for {}", video_id);

        if request.languages.is_empty() {
            let mut request = request.clone();
            request.languages = self.config.transcript.default_languages.clone();
            return self.transcripts.acquire(&video_id, &request).await;
        }

        self.transcripts.acquire(&video_id, request).await
    }

    /// Download the video, sample frames and package them as requested.
    ///
    /// The run's temporary directory is gone when this returns, whatever the outcome.
    pub async fn extract_frames(&self, request: &FramesRequest) -> Result<FrameExtraction> {
        let started = Instant::now();
        let video_id = resolve_video_id(request.url.as_deref(), request.video_id.as_deref())?;
        request.validate(self.config.frames.max_frames_limit)?;

        tracing::info!("Extracting frames from {} using {}", video_id, request.method.name());

        let media = self.media.fetch(&video_id, MediaKind::Video).await?;
        let outcome = self.extract_from(&video_id, &media, request, started).await;
        media.scope.close();

        outcome
    }

    async fn extract_from(
        &self,
        video_id: &VideoId,
        media: &DownloadedMedia,
        request: &FramesRequest,
        started: Instant,
    ) -> Result<FrameExtraction> {
        let duration = self.probe.duration_seconds(&media.path).await;
        if duration <= 0.0 {
            return Err(PipelineError::ProbeFailed {
                path: media.path.clone(),
            });
        }

        let frames_dir = media
            .scope
            .create_subdir("frames")
            .map_err(|e| PipelineError::ExtractionFailed(format!("could not create frame directory: {}", e)))?;

        let timestamps = match request.method {
            FrameMethod::Interval { interval_seconds } => {
                interval_timestamps(duration, interval_seconds, request.max_frames)
            }
            FrameMethod::SceneDetect { threshold } => {
                let scenes = match self.scenes.detect(&media.path, threshold, duration).await {
                    Ok(scenes) => scenes,
                    Err(e) => {
                        tracing::warn!("Error detecting scenes: {:#}", e);
                        Vec::new()
                    }
                };
                scene_timestamps(&scenes, duration, request.max_frames)
            }
        };
        tracing::info!("Sampling {} timestamps over {:.1}s", timestamps.len(), duration);

        let mut frames = self.grabber.extract_at(&media.path, &frames_dir, &timestamps).await;
        if frames.is_empty() {
            return Err(PipelineError::ExtractionFailed(format!(
                "none of the {} frames could be extracted",
                timestamps.len()
            )));
        }

        let archive = match &request.output {
            FrameOutput::Metadata => {
                frames::detach_files(&mut frames);
                None
            }
            FrameOutput::Directory(dir) => {
                persist_frames(&mut frames, dir).await?;
                None
            }
            FrameOutput::Archive(path) => {
                let built = package(&frames_dir, path).await?;
                frames::detach_files(&mut frames);
                Some(built)
            }
        };

        let result = ExtractionResult {
            video_id: video_id.clone(),
            title: media.title.clone(),
            method: request.method.name().to_string(),
            total_frames: frames.len(),
            frames,
            video_duration: duration,
            extraction_time: started.elapsed().as_secs_f64(),
            completed_at: chrono::Utc::now(),
        };

        Ok(match archive {
            Some(path) => FrameExtraction::Archive { path, result },
            None => FrameExtraction::Frames(result),
        })
    }
}

/// Copy frames out of the run's scope and point the records at the copies.
///
/// A failed copy removes the frames already written, so `dir` never holds a partial set.
async fn persist_frames(frames: &mut [FrameRecord], dir: &Path) -> Result<()> {
    let failed = |e: std::io::Error| PipelineError::ExtractionFailed(format!("could not copy frames to {}: {}", dir.display(), e));

    tokio::fs::create_dir_all(dir).await.map_err(failed)?;

    let mut written: Vec<Option<std::path::PathBuf>> = Vec::with_capacity(frames.len());
    for frame in frames.iter() {
        let Some(name) = frame.file.file_name() else {
            written.push(None);
            continue;
        };
        let destination = dir.join(name);
        if let Err(e) = tokio::fs::copy(&frame.file, &destination).await {
            for copied in written.iter().flatten() {
                if let Err(remove_error) = tokio::fs::remove_file(copied).await {
                    tracing::warn!("Failed to remove {}: {}", copied.display(), remove_error);
                }
            }
            return Err(failed(e));
        }
        written.push(Some(destination));
    }

    for (frame, destination) in frames.iter_mut().zip(written) {
        if let Some(destination) = destination {
            frame.file = destination;
        }
    }

    tracing::info!("Saved {} frames to {}", frames.len(), dir.display());
    Ok(())
}

/// Build the archive off the async runtime; a failed build removes the archive only if it created it
async fn package(frames_dir: &Path, archive_path: &Path) -> Result<std::path::PathBuf> {
    let source = frames_dir.to_path_buf();
    let destination = archive_path.to_path_buf();
    let preexisting = archive_path.exists();

    let built = tokio::task::spawn_blocking(move || build_archive(&source, &destination))
        .await
        .map_err(|e| PipelineError::ExtractionFailed(format!("archive task failed: {}", e)))?;

    built.map_err(|e| {
        if !preexisting && archive_path.exists() {
            if let Err(remove_error) = fs_err::remove_file(archive_path) {
                tracing::warn!("Failed to remove partial archive: {}", remove_error);
            }
        }
        PipelineError::ExtractionFailed(format!("could not build archive: {:#}", e))
    })
}

#[cfg(feature = "whisper")]
fn speech_engine(config: &Config) -> Option<Arc<dyn SpeechToText>> {
    let model_path = config.transcript.stt.model_path.clone()?;
    Some(Arc::new(crate::transcribe::stt::WhisperEngine::new(
        model_path,
        config.tools.ffmpeg.clone(),
        &config.transcript.stt,
    )))
}

#[cfg(not(feature = "whisper"))]
fn speech_engine(config: &Config) -> Option<Arc<dyn SpeechToText>> {
    if config.transcript.stt.model_path.is_some() {
        tracing::warn!("A speech-to-text model is configured but tubeframes was built without the `whisper` feature");
    }
    None
}
