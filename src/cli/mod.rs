use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tubeframes",
    about = "Fetch transcripts and sample frames from YouTube videos",
    version,
    long_about = "Fetches transcripts for YouTube videos, falling back from manual captions to generated captions, \
an optional captioning API and local speech-to-text. Also samples still frames at fixed intervals or scene changes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Config file (defaults to ./tubeframes.yaml, then the user config directory)
    #[arg(long, global = true, env = "TUBEFRAMES_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the transcript of a video
    Transcript {
        /// Video URL (youtube.com, youtu.be, shorts, embed)
        #[arg(value_name = "URL")]
        url: Option<String>,

        /// Video identifier; takes precedence over the URL
        #[arg(long, value_name = "ID")]
        id: Option<String>,

        /// Preferred caption language, in order (repeatable)
        #[arg(short, long = "lang", value_name = "LANG")]
        languages: Vec<String>,

        /// Translate the caption track into this language
        #[arg(long, value_name = "LANG")]
        translate_to: Option<String>,

        /// Try the remote captioning API when no caption track is usable
        #[arg(long)]
        remote_api: bool,

        /// Fall back to local speech-to-text when nothing else works
        #[arg(long)]
        stt: bool,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Include timestamps in text output (srt/vtt formats always include timestamps)
        #[arg(long)]
        timestamps: bool,
    },

    /// Sample still frames from a video
    Frames {
        /// Video URL (youtube.com, youtu.be, shorts, embed)
        #[arg(value_name = "URL")]
        url: Option<String>,

        /// Video identifier; takes precedence over the URL
        #[arg(long, value_name = "ID")]
        id: Option<String>,

        /// How timestamps are chosen
        #[arg(short, long, value_enum, default_value = "interval")]
        method: MethodArg,

        /// Seconds between frames for the interval method
        #[arg(long, value_name = "SECONDS")]
        interval: Option<f64>,

        /// Scene detection threshold; higher means fewer scenes
        #[arg(long, value_name = "VALUE")]
        threshold: Option<f64>,

        /// Maximum number of frames
        #[arg(long, value_name = "COUNT")]
        max_frames: Option<usize>,

        /// Package frames into a ZIP archive, `--zip=FILE` (a generated name is used if no path is given)
        #[arg(long, value_name = "FILE", num_args = 0..=1, require_equals = true)]
        zip: Option<Option<PathBuf>>,

        /// Copy frames into this directory
        #[arg(long, value_name = "DIR", conflicts_with = "zip")]
        out_dir: Option<PathBuf>,

        /// Listing format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ListingFormat,

        /// Write the listing to a file instead of the console
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a config file with the current settings
        #[arg(long)]
        init: bool,
    },

    /// Check the external tools
    Tools,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with timestamps
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
pub enum ListingFormat {
    /// One line per frame
    Text,
    /// The full extraction result
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodArg {
    /// Fixed spacing from the start of the video
    Interval,
    /// Midpoint of each detected scene
    Scenedetect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_arguments() {
        let cli = Cli::try_parse_from([
            "tubeframes",
            "transcript",
            "https://youtu.be/dQw4w9WgXcQ",
            "-l",
            "de",
            "--lang",
            "en",
            "--stt",
            "-f",
            "srt",
        ])
        .unwrap();

        match cli.command {
            Commands::Transcript {
                url,
                languages,
                stt,
                remote_api,
                format,
                ..
            } => {
                assert_eq!(url.as_deref(), Some("https://youtu.be/dQw4w9WgXcQ"));
                assert_eq!(languages, vec!["de".to_string(), "en".to_string()]);
                assert!(stt);
                assert!(!remote_api);
                assert!(matches!(format, OutputFormat::Srt));
            }
            _ => panic!("expected transcript command"),
        }
    }

    #[test]
    fn test_zip_flag_with_and_without_path() {
        let cli = Cli::try_parse_from(["tubeframes", "frames", "--id", "dQw4w9WgXcQ", "--zip"]).unwrap();
        match cli.command {
            Commands::Frames { zip, method, .. } => {
                assert_eq!(zip, Some(None));
                assert_eq!(method, MethodArg::Interval);
            }
            _ => panic!("expected frames command"),
        }

        let cli = Cli::try_parse_from(["tubeframes", "frames", "--id", "dQw4w9WgXcQ", "--zip=out.zip"]).unwrap();
        match cli.command {
            Commands::Frames { zip, .. } => assert_eq!(zip, Some(Some(PathBuf::from("out.zip")))),
            _ => panic!("expected frames command"),
        }
    }

    #[test]
    fn test_zip_flag_leaves_following_url_alone() {
        let cli = Cli::try_parse_from(["tubeframes", "frames", "--zip", "https://youtu.be/dQw4w9WgXcQ"]).unwrap();
        match cli.command {
            Commands::Frames { url, zip, .. } => {
                assert_eq!(url.as_deref(), Some("https://youtu.be/dQw4w9WgXcQ"));
                assert_eq!(zip, Some(None));
            }
            _ => panic!("expected frames command"),
        }
    }

    #[test]
    fn test_zip_conflicts_with_out_dir() {
        let parsed = Cli::try_parse_from(["tubeframes", "frames", "--id", "x", "--zip=a.zip", "--out-dir", "d"]);
        assert!(parsed.is_err());
    }
}
