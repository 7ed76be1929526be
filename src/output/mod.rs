use anyhow::Result;
use std::path::Path;

use crate::cli::{ListingFormat, OutputFormat};
use crate::frames::FrameExtraction;
use crate::transcribe::Transcript;

pub mod formatters;

pub use formatters::*;

/// Render a transcript in the requested format
pub fn render_transcript(transcript: &Transcript, format: &OutputFormat, include_timestamps: bool) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format_as_text(transcript, include_timestamps),
        OutputFormat::Json => format_as_json(transcript)?,
        OutputFormat::Srt => format_as_srt(transcript),
        OutputFormat::Vtt => format_as_vtt(transcript),
        OutputFormat::Csv => format_as_csv(transcript),
    })
}

/// Render a frame extraction listing in the requested format
pub fn render_frames(extraction: &FrameExtraction, format: &ListingFormat) -> Result<String> {
    Ok(match format {
        ListingFormat::Text => format_frames_as_text(extraction),
        ListingFormat::Json => format_frames_as_json(extraction)?,
    })
}

/// Save rendered output to file
pub fn save_to_file(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, content)?;
    Ok(())
}

/// Print rendered output to console
pub fn print_to_console(content: &str) {
    println!("{}", content.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::resolve_video_id;
    use crate::transcribe::{TranscriptSegment, TranscriptSource};
    use tempfile::TempDir;

    #[test]
    fn test_render_and_save() {
        let transcript = Transcript::new(
            resolve_video_id(None, Some("dQw4w9WgXcQ")).unwrap(),
            None,
            "en",
            vec![TranscriptSegment::new(0.0, 1.0, "hello")],
            TranscriptSource::AutoCaptions,
        );
        let content = render_transcript(&transcript, &OutputFormat::Vtt, false).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("transcript.vtt");
        save_to_file(&content, &path).unwrap();
        assert_eq!(fs_err::read_to_string(&path).unwrap(), content);
    }
}
