use std::path::{Path, PathBuf};

use tokio::{fs, process::Command};
use tracing::{info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::{
    error::{ReelcutError, Result},
    media::extract_audio,
    types::{Segment, Transcript},
    workspace::{get_audio_path, get_model_dir},
};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// File name of the ggml model for a size hint such as `small` or `medium`.
pub fn model_file_name(size: &str) -> String {
    format!("ggml-{}.bin", size.trim())
}

/// Make sure the ggml model for `size` is in the cache, downloading it if needed.
pub async fn ensure_model(cache_dir: &Path, size: &str) -> Result<PathBuf> {
    let model_name = model_file_name(size);
    let download_url = format!("{}/{}", MODEL_BASE_URL, model_name);
    let model_dir = get_model_dir(cache_dir);

    if !model_dir.exists() {
        fs::create_dir_all(&model_dir).await?;
    }

    let model_path = model_dir.join(&model_name);
    if model_path.exists() {
        return Ok(model_path);
    }

    info!(url = %download_url, "downloading whisper model");
    let partial_path = model_dir.join(format!("{}.part", model_name));
    let output = Command::new("curl")
        .arg("-f")
        .arg("-L")
        .arg(&download_url)
        .arg("-o")
        .arg(&partial_path)
        .output()
        .await?;

    if !output.status.success() {
        let _ = fs::remove_file(&partial_path).await;
        return Err(ReelcutError::ModelDownloadFailed {
            url: download_url,
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    fs::rename(&partial_path, &model_path).await?;
    Ok(model_path)
}

fn transcript_error(audio_path: &Path, reason: impl std::fmt::Display) -> ReelcutError {
    ReelcutError::TranscriptFailed {
        audio_path: audio_path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn read_samples(audio_path: &Path) -> Result<Vec<f32>> {
    let mut reader =
        hound::WavReader::open(audio_path).map_err(|e| transcript_error(audio_path, e))?;
    reader
        .samples::<i16>()
        .map(|s| {
            s.map(|s| s as f32 / i16::MAX as f32)
                .map_err(|e| transcript_error(audio_path, e))
        })
        .collect()
}

fn run_whisper(audio_path: &Path, model_path: &Path, language: &str) -> Result<Transcript> {
    let samples = read_samples(audio_path)?;

    let ctx_params = WhisperContextParameters {
        use_gpu: true,
        flash_attn: true,
        ..Default::default()
    };
    let model_path_str = model_path
        .to_str()
        .ok_or_else(|| transcript_error(audio_path, "model path is not valid UTF-8"))?;
    let ctx = WhisperContext::new_with_params(model_path_str, ctx_params)
        .map_err(|e| transcript_error(audio_path, format!("failed to load model: {}", e)))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
    params.set_language(Some(language));

    let mut state = ctx
        .create_state()
        .map_err(|e| transcript_error(audio_path, format!("failed to create state: {}", e)))?;
    state
        .full(params, &samples)
        .map_err(|e| transcript_error(audio_path, format!("failed to run model: {}", e)))?;

    let mut text = String::new();
    let mut segments: Vec<Segment> = Vec::new();

    for segment in state.as_iter() {
        let seg_text = match segment.to_str() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "skipping undecodable whisper segment");
                continue;
            }
        };
        segments.push(Segment {
            start: segment.start_timestamp() as f64 / 100.0,
            end: segment.end_timestamp() as f64 / 100.0,
            text: seg_text.to_string(),
        });
        text.push_str(seg_text);
    }

    let language_index = state.full_lang_id_from_state();
    let detected = whisper_rs::get_lang_str(language_index);

    Ok(Transcript {
        language: detected.unwrap_or(language).to_string(),
        segments,
        text,
    })
}

/// Transcribe a 16 kHz mono WAV with whisper on a blocking thread.
pub async fn transcribe_audio(
    audio_path: &Path,
    model_path: &Path,
    language: &str,
) -> Result<Transcript> {
    let audio = audio_path.to_path_buf();
    let model = model_path.to_path_buf();
    let language = language.to_string();

    tokio::task::spawn_blocking(move || run_whisper(&audio, &model, &language))
        .await
        .map_err(|e| transcript_error(audio_path, e))?
}

/// Extract audio from `media_path` into `work_dir`, transcribe it and remove the WAV.
pub async fn transcribe_media(
    ffmpeg: &Path,
    media_path: &Path,
    work_dir: &Path,
    model_path: &Path,
    language: &str,
) -> Result<Transcript> {
    let audio_path = get_audio_path(work_dir, media_path);
    extract_audio(ffmpeg, media_path, &audio_path).await?;

    let transcript = transcribe_audio(&audio_path, model_path, language).await;
    if let Err(e) = fs::remove_file(&audio_path).await {
        warn!(path = %audio_path.display(), error = %e, "failed to remove extracted audio");
    }

    let transcript = transcript?;
    info!(
        segments = transcript.segments.len(),
        language = %transcript.language,
        "transcribed {}",
        media_path.display()
    );
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_follow_ggml_convention() {
        assert_eq!(model_file_name("small"), "ggml-small.bin");
        assert_eq!(model_file_name(" medium-q5_0 "), "ggml-medium-q5_0.bin");
    }

    #[test]
    fn reading_a_missing_wav_is_a_transcript_error() {
        let err = read_samples(Path::new("/nonexistent/audio.wav")).unwrap_err();
        assert!(matches!(err, ReelcutError::TranscriptFailed { .. }));
    }

    #[test]
    fn reads_and_scales_pcm_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for sample in [0i16, i16::MAX, -i16::MAX] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        assert_eq!(read_samples(&path).unwrap(), vec![0.0, 1.0, -1.0]);
    }
}
