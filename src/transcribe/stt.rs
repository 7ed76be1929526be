use async_trait::async_trait;
use std::path::Path;

use super::TranscriptSegment;

/// A segment as reported by a speech-to-text engine
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Output of a speech-to-text run
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechTranscript {
    pub language: String,
    pub segments: Vec<SpeechSegment>,
}

/// Transcribes a local audio file into ordered segments
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio_path: &Path, language_hint: Option<&str>) -> anyhow::Result<SpeechTranscript>;
}

/// Convert engine segments to transcript segments.
///
/// Durations are `end - start` clamped at zero; segments without text are dropped.
pub fn to_transcript_segments(segments: Vec<SpeechSegment>) -> Vec<TranscriptSegment> {
    segments
        .into_iter()
        .filter_map(|segment| {
            let text = segment.text.trim();
            if text.is_empty() {
                return None;
            }
            let start = segment.start.max(0.0);
            Some(TranscriptSegment::new(start, (segment.end - start).max(0.0), text))
        })
        .collect()
}

#[cfg(feature = "whisper")]
pub use whisper::WhisperEngine;

#[cfg(feature = "whisper")]
mod whisper {
    use anyhow::{anyhow, Context};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tokio::process::Command;
    use tokio::sync::OnceCell;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    use super::{SpeechSegment, SpeechToText, SpeechTranscript};
    use crate::config::SttConfig;

    const WHISPER_SAMPLE_RATE: u32 = 16_000;

    /// Local whisper.cpp engine; the model is loaded on first use and shared afterwards
    pub struct WhisperEngine {
        model_path: PathBuf,
        vad_model_path: Option<PathBuf>,
        ffmpeg_path: PathBuf,
        use_gpu: bool,
        no_speech_threshold: f32,
        context: OnceCell<Arc<WhisperContext>>,
    }

    impl WhisperEngine {
        pub fn new(model_path: PathBuf, ffmpeg_path: PathBuf, config: &SttConfig) -> Self {
            Self {
                model_path,
                vad_model_path: config.vad_model_path.clone(),
                ffmpeg_path,
                use_gpu: config.use_gpu,
                no_speech_threshold: config.no_speech_threshold,
                context: OnceCell::new(),
            }
        }

        async fn context(&self) -> anyhow::Result<Arc<WhisperContext>> {
            let context = self
                .context
                .get_or_try_init(|| async {
                    let model_path = self.model_path.clone();
                    let use_gpu = self.use_gpu;
                    tokio::task::spawn_blocking(move || load_context(&model_path, use_gpu)).await?
                })
                .await?;
            Ok(Arc::clone(context))
        }
    }

    fn load_context(model_path: &Path, use_gpu: bool) -> anyhow::Result<Arc<WhisperContext>> {
        tracing::info!(model = %model_path.display(), "loading whisper model");

        let mut params = WhisperContextParameters::default();
        params.use_gpu(use_gpu);

        let path = model_path
            .to_str()
            .ok_or_else(|| anyhow!("model path contains invalid UTF-8"))?;
        let context = WhisperContext::new_with_params(path, params)
            .map_err(|e| anyhow!("failed to load whisper model {}: {}", model_path.display(), e))?;

        Ok(Arc::new(context))
    }

    #[async_trait]
    impl SpeechToText for WhisperEngine {
        async fn transcribe(&self, audio_path: &Path, language_hint: Option<&str>) -> anyhow::Result<SpeechTranscript> {
            let samples = decode_audio(&self.ffmpeg_path, audio_path).await?;
            let context = self.context().await?;
            let hint = language_hint.map(str::to_string);
            let vad_model = self.vad_model_path.clone();
            let threshold = self.no_speech_threshold;

            tokio::task::spawn_blocking(move || {
                run_whisper(&context, &samples, hint.as_deref(), vad_model.as_deref(), threshold)
            })
            .await?
        }
    }

    /// Decode any audio file to 16kHz mono f32 via ffmpeg
    async fn decode_audio(ffmpeg_path: &Path, audio_path: &Path) -> anyhow::Result<Vec<f32>> {
        let output = Command::new(ffmpeg_path)
            .args(["-nostdin", "-threads", "0", "-i"])
            .arg(audio_path)
            .args(["-f", "s16le", "-ac", "1", "-acodec", "pcm_s16le", "-ar"])
            .arg(WHISPER_SAMPLE_RATE.to_string())
            .arg("-")
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", ffmpeg_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg failed to decode audio: {}", stderr.trim());
        }
        if output.stdout.is_empty() {
            anyhow::bail!("ffmpeg produced no audio");
        }

        Ok(output
            .stdout
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
            .collect())
    }

    fn run_whisper(
        context: &WhisperContext,
        samples: &[f32],
        language_hint: Option<&str>,
        vad_model_path: Option<&Path>,
        no_speech_threshold: f32,
    ) -> anyhow::Result<SpeechTranscript> {
        let mut state = context
            .create_state()
            .map_err(|e| anyhow!("failed to create whisper state: {}", e))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
        params.set_language(Some(language_hint.unwrap_or("auto")));
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);

        let vad_model = vad_model_path.and_then(Path::to_str);
        if let Some(vad_model) = vad_model {
            params.enable_vad(true);
            params.set_vad_model_path(Some(vad_model));
        }

        tracing::info!(samples = samples.len(), "running whisper");
        state
            .full(params, samples)
            .map_err(|e| anyhow!("whisper transcription failed: {}", e))?;

        let mut segments = Vec::new();
        for i in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(i) else {
                continue;
            };
            if segment.no_speech_probability() > no_speech_threshold {
                tracing::debug!("Dropping segment {} as non-speech", i);
                continue;
            }
            let text = segment
                .to_str_lossy()
                .map_err(|e| anyhow!("segment text error: {}", e))?
                .into_owned();

            segments.push(SpeechSegment {
                start: segment.start_timestamp() as f64 / 100.0,
                end: segment.end_timestamp() as f64 / 100.0,
                text,
            });
        }

        let language = match language_hint {
            Some(hint) => hint.to_string(),
            None => whisper_rs::get_lang_str(state.full_lang_id_from_state())
                .unwrap_or("unknown")
                .to_string(),
        };

        Ok(SpeechTranscript { language, segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_transcript_segments() {
        let segments = to_transcript_segments(vec![
            SpeechSegment { start: 0.0, end: 2.5, text: "  first  ".to_string() },
            SpeechSegment { start: 2.5, end: 2.0, text: "clamped".to_string() },
            SpeechSegment { start: 3.0, end: 4.0, text: "   ".to_string() },
        ]);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "first");
        assert_eq!(segments[0].duration, 2.5);
        assert_eq!(segments[1].start, 2.5);
        assert_eq!(segments[1].duration, 0.0);
    }
}
