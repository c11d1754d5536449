use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::{
    error::Result,
    prompt::{DEFAULT_PROMPT_TEMPLATE, SUBTITLE_PLACEHOLDER},
    provider::{LlmEndpoint, Provider, chat_completions_url},
    ranges::{MalformedPolicy, RangeParams},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ffmpeg not found at {0}")]
    FfmpegNotFound(PathBuf),

    #[error("Missing API key for {provider}: set `openai_api_key` or the {env_var} environment variable")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("`{field}` must not be empty when using {provider}")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },

    #[error("Prompt template does not contain the {{subtitle_content}} placeholder")]
    MissingPlaceholder,

    #[error("`{field}` must be a finite, non-negative number, got {value}")]
    InvalidNumber { field: &'static str, value: f64 },
}

/// Settings for one run, read from `config.json`.
///
/// Every key is optional in the file; absent keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "llm_type")]
    pub provider: Provider,
    #[serde(alias = "gpt_api_key")]
    pub openai_api_key: String,
    #[serde(alias = "gpt_model_name")]
    pub openai_model: String,
    pub ollama_api_base: String,
    #[serde(alias = "ollama_model_name")]
    pub ollama_model: String,
    pub ffmpeg_path: PathBuf,
    pub output_dir: PathBuf,
    pub buffer_time: f64,
    pub min_duration: f64,
    pub merge_gap: f64,
    pub skip_malformed_timestamps: bool,
    pub whisper_model: String,
    pub language: String,
    pub ai_prompt_template: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            openai_api_key: String::new(),
            openai_model: Provider::Openai.config().default_model.to_string(),
            ollama_api_base: Provider::Ollama.config().default_base_url.to_string(),
            ollama_model: Provider::Ollama.config().default_model.to_string(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            output_dir: PathBuf::from("out"),
            buffer_time: RangeParams::DEFAULT_BUFFER_SECONDS,
            min_duration: RangeParams::DEFAULT_MIN_DURATION_SECONDS,
            merge_gap: RangeParams::DEFAULT_MERGE_GAP_SECONDS,
            skip_malformed_timestamps: false,
            whisper_model: "small".to_string(),
            language: "zh".to_string(),
            ai_prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

/// `<config dir>/reelcut/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelcut")
        .join("config.json")
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is missing or unreadable JSON.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let pretty_json = serde_json::to_string_pretty(self)?;
        fs::write(path, &pretty_json).await?;
        Ok(())
    }

    pub fn range_params(&self) -> RangeParams {
        let malformed = if self.skip_malformed_timestamps {
            MalformedPolicy::Skip
        } else {
            MalformedPolicy::Zero
        };
        RangeParams::new(self.buffer_time, self.merge_gap, self.min_duration)
            .with_malformed(malformed)
    }

    /// Resolve the chat-completion endpoint for the selected provider.
    pub fn llm_endpoint(&self) -> std::result::Result<LlmEndpoint, ConfigError> {
        let env_key = self
            .provider
            .config()
            .env_var
            .and_then(|var| std::env::var(var).ok());
        self.llm_endpoint_with(env_key)
    }

    fn llm_endpoint_with(
        &self,
        env_key: Option<String>,
    ) -> std::result::Result<LlmEndpoint, ConfigError> {
        match self.provider {
            Provider::Openai => {
                let api_key = Some(self.openai_api_key.trim())
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .or(env_key.filter(|k| !k.trim().is_empty()))
                    .ok_or(ConfigError::MissingApiKey {
                        provider: Provider::Openai.name(),
                        env_var: Provider::Openai.config().env_var.unwrap_or_default(),
                    })?;
                require(Provider::Openai, "openai_model", &self.openai_model)?;

                Ok(LlmEndpoint {
                    provider: Provider::Openai,
                    url: chat_completions_url(Provider::Openai.config().default_base_url),
                    model: self.openai_model.trim().to_string(),
                    api_key: Some(api_key),
                })
            }
            Provider::Ollama => {
                require(Provider::Ollama, "ollama_api_base", &self.ollama_api_base)?;
                require(Provider::Ollama, "ollama_model", &self.ollama_model)?;

                Ok(LlmEndpoint {
                    provider: Provider::Ollama,
                    url: chat_completions_url(self.ollama_api_base.trim()),
                    model: self.ollama_model.trim().to_string(),
                    api_key: None,
                })
            }
        }
    }

    /// Check everything a run needs before any work starts.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !ffmpeg_usable(&self.ffmpeg_path) {
            return Err(ConfigError::FfmpegNotFound(self.ffmpeg_path.clone()));
        }

        self.llm_endpoint()?;

        if !self.ai_prompt_template.contains(SUBTITLE_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder);
        }

        for (field, value) in [
            ("buffer_time", self.buffer_time),
            ("min_duration", self.min_duration),
            ("merge_gap", self.merge_gap),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidNumber { field, value });
            }
        }

        Ok(())
    }
}

fn require(
    provider: Provider,
    field: &'static str,
    value: &str,
) -> std::result::Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField {
            provider: provider.name(),
            field,
        });
    }
    Ok(())
}

/// A bare program name is looked up on `PATH` at spawn time; anything else must exist.
fn ffmpeg_usable(path: &Path) -> bool {
    let bare = path.components().count() == 1 && path.parent() == Some(Path::new(""));
    bare || path.is_file()
}
