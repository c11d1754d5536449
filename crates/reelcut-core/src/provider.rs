use serde::{Deserialize, Serialize};

/// Chat-completion backend used to pick highlight ranges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[serde(alias = "gpt")]
    Openai,
    Ollama,
}

pub struct ProviderConfig {
    pub default_base_url: &'static str,
    pub default_model: &'static str,
    pub env_var: Option<&'static str>,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Openai => ProviderConfig {
                default_base_url: "https://api.openai.com/v1",
                default_model: "gpt-4o-mini",
                env_var: Some("OPENAI_API_KEY"),
            },
            Provider::Ollama => ProviderConfig {
                default_base_url: "http://localhost:11434/v1",
                default_model: "llama3",
                env_var: None,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Openai => "OpenAI",
            Provider::Ollama => "Ollama",
        }
    }
}

/// Everything needed to send one chat-completion request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LlmEndpoint {
    pub provider: Provider,
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
}

/// `<base>/chat/completions`, tolerating a trailing slash on `base`.
pub fn chat_completions_url(base: &str) -> String {
    format!("{}/chat/completions", base.trim_end_matches('/'))
}
