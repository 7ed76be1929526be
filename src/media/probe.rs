use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Best-effort duration probe backed by ffprobe
#[derive(Debug, Clone)]
pub struct DurationProbe {
    ffprobe_path: PathBuf,
}

impl DurationProbe {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Duration of a local media file in seconds.
    ///
    /// Returns `0.0` when the duration cannot be determined; callers treat that as unknown.
    pub async fn duration_seconds(&self, media_path: &Path) -> f64 {
        match self.run(media_path).await {
            Ok(seconds) => seconds,
            Err(e) => {
                tracing::warn!("Error getting duration of {}: {:#}", media_path.display(), e);
                0.0
            }
        }
    }

    async fn run(&self, media_path: &Path) -> anyhow::Result<f64> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v", "quiet",
                "-show_entries", "format=duration",
                "-of", "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(media_path)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!("ffprobe exited with {}", output.status);
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the single seconds value ffprobe prints
pub fn parse_duration(stdout: &str) -> anyhow::Result<f64> {
    let value = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| anyhow::anyhow!("ffprobe printed nothing"))?;

    let seconds: f64 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("unexpected ffprobe output: {}", value))?;

    if !seconds.is_finite() || seconds < 0.0 {
        anyhow::bail!("ffprobe reported an invalid duration: {}", seconds);
    }

    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("42.000000\n").unwrap(), 42.0);
        assert_eq!(parse_duration("\n  12.5  \n").unwrap(), 12.5);
        assert!(parse_duration("N/A\n").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-3").is_err());
    }

    #[tokio::test]
    async fn test_missing_tool_yields_zero() {
        let probe = DurationProbe::new("/nonexistent/ffprobe");
        assert_eq!(probe.duration_seconds(Path::new("video.mp4")).await, 0.0);
    }
}
