use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod archive;
pub mod sampler;
pub mod scenes;

pub use archive::build_archive;
pub use sampler::{interval_timestamps, FrameGrabber};
pub use scenes::{scene_timestamps, FfmpegSceneDetector, SceneDetector, SceneSpan};

use crate::extractors::VideoId;
use crate::{PipelineError, Result};

/// How sampling timestamps are chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum FrameMethod {
    /// Every `interval_seconds`, starting at zero
    Interval { interval_seconds: f64 },
    /// Midpoint of every detected scene
    #[serde(rename = "scenedetect")]
    SceneDetect { threshold: f64 },
}

impl FrameMethod {
    pub fn name(&self) -> &'static str {
        match self {
            FrameMethod::Interval { .. } => "interval",
            FrameMethod::SceneDetect { .. } => "scenedetect",
        }
    }
}

/// What happens to extracted frames once the run ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutput {
    /// Only the listing is returned; frame files are discarded with the run
    Metadata,
    /// Frames are copied into this directory
    Directory(PathBuf),
    /// Frames are packaged into a ZIP archive at this path
    Archive(PathBuf),
}

/// Parameters of a frame extraction request
#[derive(Debug, Clone)]
pub struct FramesRequest {
    pub url: Option<String>,
    pub video_id: Option<String>,
    pub method: FrameMethod,
    pub max_frames: usize,
    pub output: FrameOutput,
}

impl FramesRequest {
    /// Reject parameters that make timestamp generation meaningless
    pub fn validate(&self, max_frames_limit: usize) -> Result<()> {
        if self.max_frames == 0 || self.max_frames > max_frames_limit {
            return Err(PipelineError::InvalidParameters(format!(
                "max_frames must be between 1 and {}, got {}",
                max_frames_limit, self.max_frames
            )));
        }

        match self.method {
            FrameMethod::Interval { interval_seconds } if !(interval_seconds > 0.0) || !interval_seconds.is_finite() => {
                Err(PipelineError::InvalidParameters(format!(
                    "interval must be a positive number of seconds, got {}",
                    interval_seconds
                )))
            }
            FrameMethod::SceneDetect { threshold } if !(threshold > 0.0) || !threshold.is_finite() => {
                Err(PipelineError::InvalidParameters(format!(
                    "scene threshold must be positive, got {}",
                    threshold
                )))
            }
            _ => Ok(()),
        }
    }
}

/// One extracted frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    /// Offset into the video in seconds
    pub timestamp: f64,

    /// 1-based, contiguous, chronological
    pub frame_number: usize,

    /// Where the frame lives (a bare file name once the run's files are gone)
    pub file: PathBuf,
}

/// Outcome of a frame extraction run
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub video_id: VideoId,
    pub title: Option<String>,
    pub method: String,
    pub total_frames: usize,
    pub frames: Vec<FrameRecord>,
    pub video_duration: f64,
    /// Wall-clock seconds spent on the run
    pub extraction_time: f64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl ExtractionResult {
    pub fn timestamps(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.timestamp).collect()
    }
}

/// Either the structured listing or an archive holding the frames
#[derive(Debug, Clone)]
pub enum FrameExtraction {
    Frames(ExtractionResult),
    Archive { path: PathBuf, result: ExtractionResult },
}

impl FrameExtraction {
    pub fn result(&self) -> &ExtractionResult {
        match self {
            FrameExtraction::Frames(result) => result,
            FrameExtraction::Archive { result, .. } => result,
        }
    }

    pub fn archive_path(&self) -> Option<&Path> {
        match self {
            FrameExtraction::Frames(_) => None,
            FrameExtraction::Archive { path, .. } => Some(path),
        }
    }
}

/// Rewrite frame references to bare file names
pub(crate) fn detach_files(frames: &mut [FrameRecord]) {
    for frame in frames {
        if let Some(name) = frame.file.file_name() {
            frame.file = PathBuf::from(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: FrameMethod, max_frames: usize) -> FramesRequest {
        FramesRequest {
            url: None,
            video_id: Some("ABCDEFGHIJK".to_string()),
            method,
            max_frames,
            output: FrameOutput::Metadata,
        }
    }

    #[test]
    fn test_validate() {
        assert!(request(FrameMethod::Interval { interval_seconds: 5.0 }, 10).validate(500).is_ok());
        assert!(request(FrameMethod::SceneDetect { threshold: 27.0 }, 500).validate(500).is_ok());

        for bad in [
            request(FrameMethod::Interval { interval_seconds: 0.0 }, 10),
            request(FrameMethod::Interval { interval_seconds: -2.0 }, 10),
            request(FrameMethod::Interval { interval_seconds: f64::NAN }, 10),
            request(FrameMethod::SceneDetect { threshold: 0.0 }, 10),
            request(FrameMethod::Interval { interval_seconds: 5.0 }, 0),
            request(FrameMethod::Interval { interval_seconds: 5.0 }, 501),
        ] {
            assert!(matches!(bad.validate(500), Err(PipelineError::InvalidParameters(_))));
        }
    }

    #[test]
    fn test_method_serialization() {
        let json = serde_json::to_value(FrameMethod::SceneDetect { threshold: 27.0 }).unwrap();
        assert_eq!(json["method"], "scenedetect");
        assert_eq!(FrameMethod::Interval { interval_seconds: 1.0 }.name(), "interval");
    }

    #[test]
    fn test_detach_files() {
        let mut frames = vec![FrameRecord {
            timestamp: 0.0,
            frame_number: 1,
            file: PathBuf::from("/tmp/run/frames/frame_0001.jpg"),
        }];
        detach_files(&mut frames);
        assert_eq!(frames[0].file, PathBuf::from("frame_0001.jpg"));
    }
}
