use tracing::{debug, info};

use crate::{
    error::{ReelcutError, Result},
    prompt::SYSTEM_PROMPT,
    provider::LlmEndpoint,
};

/// Request body for an OpenAI-compatible chat completion.
pub fn completion_request(model: &str, prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": SYSTEM_PROMPT,
            },
            {
                "role": "user",
                "content": prompt,
            },
        ],
        "temperature": 0.3,
    })
}

/// Pull the assistant text out of a chat-completion response.
pub fn extract_reply(response: &serde_json::Value) -> Result<String> {
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ReelcutError::LlmFailed {
            reason: format!("Invalid API response: {}", response),
        })?;
    Ok(content.to_string())
}

/// Send `prompt` to the endpoint and return the reply text.
pub async fn complete(endpoint: &LlmEndpoint, prompt: &str) -> Result<String> {
    info!(provider = endpoint.provider.name(), model = %endpoint.model, "calling language model");

    let mut request = reqwest::Client::new()
        .post(&endpoint.url)
        .header("Content-Type", "application/json")
        .json(&completion_request(&endpoint.model, prompt));
    if let Some(api_key) = &endpoint.api_key {
        request = request.header("Authorization", format!("Bearer {}", api_key));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ReelcutError::LlmFailed {
            reason: format!("{} returned {}: {}", endpoint.url, status, body),
        });
    }

    let response = response.json::<serde_json::Value>().await?;
    let reply = extract_reply(&response)?;
    debug!(reply = %reply, "language model reply");
    Ok(reply)
}
