use std::ffi::OsStr;
use std::path::PathBuf;

use futures_util::future::join_all;

use crate::config::Config;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", bytes_f / THRESHOLD.powi(unit_index as i32), UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
            _ => '_',
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Generate a unique filename with timestamp
pub fn generate_unique_filename(base_name: &str, extension: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let random_suffix = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();

    format!(
        "tubeframes_{}_{}_{}.{}",
        sanitize_filename(base_name),
        timestamp,
        random_suffix,
        extension
    )
}

/// Availability of one external tool
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub name: &'static str,
    pub path: PathBuf,
    pub purpose: &'static str,
    pub available: bool,
}

/// Check the external tools the configuration points at
pub async fn check_dependencies(config: &Config) -> Vec<ToolStatus> {
    let tools = [
        ("yt-dlp", &config.tools.yt_dlp, "required for captions and downloads"),
        ("ffmpeg", &config.tools.ffmpeg, "required for frame extraction and speech-to-text"),
        ("ffprobe", &config.tools.ffprobe, "required for frame extraction"),
    ];

    let available = join_all(tools.iter().map(|(_, path, _)| check_command_available(path))).await;

    tools
        .into_iter()
        .zip(available)
        .map(|((name, path, purpose), available)| ToolStatus {
            name,
            path: path.clone(),
            purpose,
            available,
        })
        .collect()
}

/// Check if a command is available, either in PATH or at the given location
pub async fn check_command_available(command: impl AsRef<OsStr>) -> bool {
    use tokio::process::Command;

    // ffmpeg and ffprobe only understand `-version`
    let flag = match std::path::Path::new(command.as_ref()).file_stem().and_then(OsStr::to_str) {
        Some(name) if name.starts_with("ff") => "-version",
        _ => "--version",
    };

    Command::new(command)
        .arg(flag)
        .kill_on_drop(true)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
        assert_eq!(format_duration(-4.0), "0s");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Hello World!"), "Hello World_");
        assert_eq!(sanitize_filename("test/file?name"), "test_file_name");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
    }

    #[test]
    fn test_generate_unique_filename() {
        let name = generate_unique_filename("dQw4w9WgXcQ", "zip");
        assert!(name.starts_with("tubeframes_dQw4w9WgXcQ_"));
        assert!(name.ends_with(".zip"));
        assert_ne!(name, generate_unique_filename("dQw4w9WgXcQ", "zip"));
    }

    #[tokio::test]
    async fn test_missing_tools_are_reported() {
        let mut config = Config::default();
        config.tools.yt_dlp = "/nonexistent/yt-dlp".into();
        config.tools.ffmpeg = "/nonexistent/ffmpeg".into();
        config.tools.ffprobe = "/nonexistent/ffprobe".into();

        let statuses = check_dependencies(&config).await;
        assert_eq!(statuses.len(), 3);
        assert!(statuses.iter().all(|tool| !tool.available));
        assert_eq!(statuses[0].name, "yt-dlp");
        assert_eq!(statuses[0].path, PathBuf::from("/nonexistent/yt-dlp"));
        assert!(!check_command_available("/nonexistent/ffmpeg").await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_available_tool_is_reported_by_path() {
        let mut config = Config::default();
        config.tools.yt_dlp = "/nonexistent/yt-dlp".into();
        config.tools.ffmpeg = "/bin/true".into();
        config.tools.ffprobe = "/nonexistent/ffprobe".into();

        let statuses = check_dependencies(&config).await;
        let available: Vec<_> = statuses.iter().filter(|tool| tool.available).map(|tool| tool.name).collect();
        assert_eq!(available, vec!["ffmpeg"]);
    }
}
