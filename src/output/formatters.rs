use anyhow::Result;
use serde_json::json;

use crate::frames::FrameExtraction;
use crate::transcribe::Transcript;

/// Plain text, optionally one `[HH:MM:SS] text` line per segment
pub fn format_as_text(transcript: &Transcript, include_timestamps: bool) -> String {
    if !include_timestamps {
        return transcript.text();
    }

    transcript
        .segments()
        .iter()
        .map(|segment| format!("[{}] {}", format_clock(segment.start), segment.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_as_json(transcript: &Transcript) -> Result<String> {
    Ok(serde_json::to_string_pretty(transcript)?)
}

pub fn format_as_srt(transcript: &Transcript) -> String {
    let mut out = String::new();
    for (index, segment) in transcript.segments().iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_cue_time(segment.start, ','),
            format_cue_time(segment.end(), ','),
            segment.text
        ));
    }
    out
}

pub fn format_as_vtt(transcript: &Transcript) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in transcript.segments() {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_cue_time(segment.start, '.'),
            format_cue_time(segment.end(), '.'),
            segment.text
        ));
    }
    out
}

pub fn format_as_csv(transcript: &Transcript) -> String {
    let mut out = String::from("start,duration,text\n");
    for segment in transcript.segments() {
        out.push_str(&format!(
            "{:.3},{:.3},\"{}\"\n",
            segment.start,
            segment.duration,
            segment.text.replace('"', "\"\"")
        ));
    }
    out
}

/// Human-readable frame listing
pub fn format_frames_as_text(extraction: &FrameExtraction) -> String {
    let result = extraction.result();
    let mut lines = vec![format!(
        "{} frames from {} ({}, {:.1}s video, {:.1}s elapsed)",
        result.total_frames, result.video_id, result.method, result.video_duration, result.extraction_time
    )];
    if let Some(title) = &result.title {
        lines.push(format!("Title: {}", title));
    }
    if let Some(path) = extraction.archive_path() {
        lines.push(format!("Archive: {}", path.display()));
    }
    for frame in &result.frames {
        lines.push(format!(
            "#{:<4} {:>10}  {}",
            frame.frame_number,
            format_cue_time(frame.timestamp, '.'),
            frame.file.display()
        ));
    }
    lines.join("\n")
}

pub fn format_frames_as_json(extraction: &FrameExtraction) -> Result<String> {
    let mut value = serde_json::to_value(extraction.result())?;
    if let Some(path) = extraction.archive_path() {
        value["archive"] = json!(path);
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// `HH:MM:SS<sep>mmm`, as used by subtitle cues
fn format_cue_time(seconds: f64, separator: char) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        millis / 3_600_000,
        (millis % 3_600_000) / 60_000,
        (millis % 60_000) / 1000,
        separator,
        millis % 1000
    )
}
