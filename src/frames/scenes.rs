use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// A detected scene, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SceneSpan {
    pub start: f64,
    pub end: f64,
}

impl SceneSpan {
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Content-difference scene boundary detection
#[async_trait]
pub trait SceneDetector: Send + Sync {
    /// Scenes of the video in chronological order; higher thresholds give fewer scenes
    async fn detect(&self, video_path: &Path, threshold: f64, duration: f64) -> anyhow::Result<Vec<SceneSpan>>;
}

/// Scene detection through ffmpeg's `scene` score
#[derive(Debug, Clone)]
pub struct FfmpegSceneDetector {
    ffmpeg_path: PathBuf,
    min_scene_length: f64,
}

impl FfmpegSceneDetector {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, min_scene_length: f64) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            min_scene_length: min_scene_length.max(0.0),
        }
    }
}

/// Map a content threshold (0-100 scale, 27 by default) to an ffmpeg scene score
pub fn scene_score(threshold: f64) -> f64 {
    (threshold / 100.0).clamp(0.001, 1.0)
}

#[async_trait]
impl SceneDetector for FfmpegSceneDetector {
    async fn detect(&self, video_path: &Path, threshold: f64, duration: f64) -> anyhow::Result<Vec<SceneSpan>> {
        let filter = format!("select='gt(scene,{:.3})',showinfo", scene_score(threshold));
        tracing::debug!("Detecting scenes in {} with filter {}", video_path.display(), filter);

        let output = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-nostdin", "-i"])
            .arg(video_path)
            .args(["-an", "-filter:v", &filter, "-f", "null", "-"])
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.ffmpeg_path.display()))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg scene detection failed: {}", error.trim());
        }

        let cuts = parse_cut_times(&String::from_utf8_lossy(&output.stderr));
        let scenes = scenes_from_cuts(&cuts, duration, self.min_scene_length);
        tracing::info!("Detected {} cuts, {} scenes", cuts.len(), scenes.len());
        Ok(scenes)
    }
}

/// Pull `pts_time` values out of showinfo log lines
pub fn parse_cut_times(log: &str) -> Vec<f64> {
    log.lines()
        .filter(|line| line.contains("Parsed_showinfo"))
        .filter_map(|line| {
            let rest = &line[line.find("pts_time:")? + "pts_time:".len()..];
            rest.split_whitespace().next()?.parse::<f64>().ok()
        })
        .collect()
}

/// Turn cut times into scenes covering `[0, duration]`.
///
/// No usable cut means no scenes. Cuts closer than `min_scene_length` to the previous
/// boundary are dropped.
pub fn scenes_from_cuts(cuts: &[f64], duration: f64, min_scene_length: f64) -> Vec<SceneSpan> {
    let mut sorted: Vec<f64> = cuts.iter().copied().filter(|c| c.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let mut boundaries = vec![0.0];
    for cut in sorted {
        let previous = boundaries[boundaries.len() - 1];
        if cut <= 0.0 || cut >= duration || cut - previous < min_scene_length {
            continue;
        }
        boundaries.push(cut);
    }

    if boundaries.len() == 1 {
        return Vec::new();
    }
    boundaries.push(duration);

    boundaries
        .windows(2)
        .map(|pair| SceneSpan {
            start: pair[0],
            end: pair[1],
        })
        .collect()
}

/// Sampling timestamps for detected scenes: one midpoint per scene, capped at
/// `max_frames`, or the clip midpoint when there are no scenes
pub fn scene_timestamps(scenes: &[SceneSpan], duration: f64, max_frames: usize) -> Vec<f64> {
    if scenes.is_empty() {
        return vec![duration / 2.0];
    }

    scenes.iter().map(SceneSpan::midpoint).take(max_frames).collect()
}
