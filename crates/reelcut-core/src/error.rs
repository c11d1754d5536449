use std::path::PathBuf;
use thiserror::Error;

use crate::{config::ConfigError, ranges::EmptyReason};

#[derive(Error, Debug)]
pub enum ReelcutError {
    #[error("Model download failed for {url}: {reason}")]
    ModelDownloadFailed { url: String, reason: String },

    #[error("Audio extraction failed for {video_path}: {reason}")]
    AudioExtractionFailed { video_path: PathBuf, reason: String },

    #[error("Transcription failed for {audio_path}: {reason}")]
    TranscriptFailed { audio_path: PathBuf, reason: String },

    #[error("ffmpeg {step} failed: {reason}")]
    MediaFailed { step: &'static str, reason: String },

    #[error("Language model call failed: {reason}")]
    LlmFailed { reason: String },

    #[error("No clips to cut: {0}")]
    NoClips(#[from] EmptyReason),

    #[error("None of the {attempted} clip(s) could be cut, nothing to concatenate")]
    NoClipsProduced { attempted: usize },

    #[error("Invalid subtitle file {path}: {reason}")]
    InvalidSubtitles { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ReelcutError>;
