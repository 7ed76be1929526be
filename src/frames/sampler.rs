use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::FrameRecord;

/// Evenly spaced timestamps `0, I, 2I, ...`, `min(max_frames, ceil(duration / interval))` of them
pub fn interval_timestamps(duration: f64, interval: f64, max_frames: usize) -> Vec<f64> {
    if !(interval > 0.0) || !(duration > 0.0) {
        return Vec::new();
    }

    // Counted up front; accumulating `i * interval` can land a few ulps below `duration`
    let count = ((duration / interval).ceil() as usize).min(max_frames);
    (0..count).map(|i| i as f64 * interval).collect()
}

/// File name of the n-th extracted frame (1-based)
pub fn frame_file_name(frame_number: usize) -> String {
    format!("frame_{:04}.jpg", frame_number)
}

/// Grabs single frames with ffmpeg
#[derive(Debug, Clone)]
pub struct FrameGrabber {
    ffmpeg_path: PathBuf,
    jpeg_quality: u8,
    show_progress: bool,
}

impl FrameGrabber {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            jpeg_quality: jpeg_quality.clamp(2, 31),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Write the frame at `timestamp` to `output`
    pub async fn grab(&self, video_path: &Path, timestamp: f64, output: &Path) -> anyhow::Result<()> {
        let result = Command::new(&self.ffmpeg_path)
            .args(["-y", "-nostdin", "-v", "error", "-ss"])
            .arg(format!("{:.3}", timestamp))
            .arg("-i")
            .arg(video_path)
            .args(["-frames:v", "1", "-q:v"])
            .arg(self.jpeg_quality.to_string())
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            let error = String::from_utf8_lossy(&result.stderr);
            anyhow::bail!("ffmpeg exited with {}: {}", result.status, error.trim());
        }

        // ffmpeg exits cleanly when seeking past the last frame but writes nothing
        let written = tokio::fs::metadata(output).await.map(|m| m.len() > 0).unwrap_or(false);
        if !written {
            anyhow::bail!("ffmpeg produced no image");
        }

        Ok(())
    }

    /// Extract one frame per timestamp into `out_dir`.
    ///
    /// Frames that fail are logged and skipped; the surviving frames are numbered
    /// contiguously from 1 in timestamp order.
    pub async fn extract_at(&self, video_path: &Path, out_dir: &Path, timestamps: &[f64]) -> Vec<FrameRecord> {
        let progress = self.progress_bar(timestamps.len() as u64);
        let mut frames = Vec::with_capacity(timestamps.len());

        for &timestamp in timestamps {
            let frame_number = frames.len() + 1;
            let file = out_dir.join(frame_file_name(frame_number));

            match self.grab(video_path, timestamp, &file).await {
                Ok(()) => frames.push(FrameRecord {
                    timestamp,
                    frame_number,
                    file,
                }),
                Err(e) => {
                    tracing::warn!("Error extracting frame at {:.3}s: {:#}", timestamp, e);
                    let _ = tokio::fs::remove_file(&file).await;
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        tracing::info!("Extracted {} of {} frames", frames.len(), timestamps.len());
        frames
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            progress.set_style(style);
        }
        progress.set_message("Extracting frames...");
        progress
    }
}
