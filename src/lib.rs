//! Tubeframes - transcripts and representative frames from YouTube videos
//!
//! This library resolves a video reference, acquires a time-aligned transcript through a
//! tiered fallback chain (manual captions, auto captions, any caption track, a remote
//! captioning API and local speech-to-text), and samples still frames either at a fixed
//! interval or at scene boundaries. Every temporary download lives in a scoped directory
//! that is removed on every exit path.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod frames;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod transcribe;
pub mod utils;

use std::path::PathBuf;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{resolve_video_id, VideoId};
pub use frames::{ExtractionResult, FrameExtraction, FrameMethod, FrameOutput, FrameRecord, FramesRequest};
pub use pipeline::Pipeline;
pub use transcribe::{Transcript, TranscriptRequest, TranscriptSegment, TranscriptSource};

/// Result type returned by every caller-facing operation
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Categorized failures of a pipeline run
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Invalid video reference: {0}")]
    InvalidReference(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("No transcript available for video {video_id}")]
    TranscriptUnavailable { video_id: String },

    #[error("Download failed for video {video_id}: {reason}")]
    DownloadFailed { video_id: String, reason: String },

    #[error("Download of video {video_id} reported success but no file was found in {}", dir.display())]
    FileNotFoundAfterDownload { video_id: String, dir: PathBuf },

    #[error("Could not determine duration of {}", path.display())]
    ProbeFailed { path: PathBuf },

    #[error("Frame extraction failed: {0}")]
    ExtractionFailed(String),
}
