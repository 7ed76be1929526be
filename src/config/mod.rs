use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "tubeframes.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool locations
    pub tools: ToolsConfig,

    /// Media download settings
    pub download: DownloadConfig,

    /// Transcript acquisition settings
    pub transcript: TranscriptConfig,

    /// Frame extraction settings
    pub frames: FramesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Highest video resolution fetched for frame extraction
    pub max_height: u32,

    /// yt-dlp player client tried before the default one
    pub preferred_client: Option<String>,

    /// Parent directory for per-run temporary directories
    pub temp_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Caption languages used when a request names none
    pub default_languages: Vec<String>,

    /// Credentials for the remote captioning API tier
    pub remote_api_key: Option<String>,

    /// Timeout for caption downloads
    pub request_timeout_seconds: u64,

    /// Local speech-to-text fallback
    pub stt: SttConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// whisper.cpp GGML model file
    pub model_path: Option<PathBuf>,

    /// Silero VAD model for whisper's voice-activity filter
    pub vad_model_path: Option<PathBuf>,

    /// Language passed to the model instead of auto-detection
    pub language_hint: Option<String>,

    /// Segments more likely than this to be non-speech are dropped
    pub no_speech_threshold: f32,

    pub use_gpu: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesConfig {
    pub default_interval: f64,
    pub default_max_frames: usize,
    pub max_frames_limit: usize,

    /// Scene detection sensitivity; higher means fewer scenes
    pub content_threshold: f64,

    /// Cuts closer than this many seconds to the previous one are ignored
    pub min_scene_length: f64,

    /// ffmpeg `-q:v` value (2 is best, 31 worst)
    pub jpeg_quality: u8,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_height: 720,
            preferred_client: Some("android".to_string()),
            temp_root: None,
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            default_languages: vec!["en".to_string()],
            remote_api_key: None,
            request_timeout_seconds: 30,
            stt: SttConfig::default(),
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            vad_model_path: None,
            language_hint: None,
            no_speech_threshold: 0.6,
            use_gpu: false,
        }
    }
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            default_interval: 5.0,
            default_max_frames: 100,
            max_frames_limit: 500,
            content_threshold: 27.0,
            min_scene_length: 0.5,
            jpeg_quality: 2,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, the working directory, the user
    /// config directory, or fall back to defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        let config = match path {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn discover() -> Option<PathBuf> {
        // Current directory first for easy testing
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        Self::user_config_path().filter(|path| path.exists())
    }

    /// Default location of the user's config file
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tubeframes").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.frames.default_interval > 0.0) {
            anyhow::bail!("frames.default_interval must be positive");
        }
        if !(self.frames.content_threshold > 0.0) {
            anyhow::bail!("frames.content_threshold must be positive");
        }
        if self.frames.max_frames_limit == 0 {
            anyhow::bail!("frames.max_frames_limit must be at least 1");
        }
        if self.frames.default_max_frames == 0 || self.frames.default_max_frames > self.frames.max_frames_limit {
            anyhow::bail!("frames.default_max_frames must be between 1 and frames.max_frames_limit");
        }
        if self.download.max_height == 0 {
            anyhow::bail!("download.max_height must be positive");
        }
        if !(0.0..=1.0).contains(&self.transcript.stt.no_speech_threshold) {
            anyhow::bail!("transcript.stt.no_speech_threshold must be between 0 and 1");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.tools.yt_dlp.display());
        println!("  ffmpeg: {}", self.tools.ffmpeg.display());
        println!("  ffprobe: {}", self.tools.ffprobe.display());
        println!("  Max Height: {}p", self.download.max_height);
        if let Some(client) = &self.download.preferred_client {
            println!("  Preferred Client: {}", client);
        }
        println!("  Languages: {}", self.transcript.default_languages.join(", "));
        println!(
            "  Remote API: {}",
            if self.transcript.remote_api_key.is_some() { "configured" } else { "not configured" }
        );
        match &self.transcript.stt.model_path {
            Some(path) => println!("  STT Model: {}", path.display()),
            None => println!("  STT Model: not configured"),
        }
        println!(
            "  Frames: every {}s, up to {} (limit {}), scene threshold {}",
            self.frames.default_interval,
            self.frames.default_max_frames,
            self.frames.max_frames_limit,
            self.frames.content_threshold
        );
    }
}
