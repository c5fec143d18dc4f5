use serde::{Deserialize, Serialize};
use reqwest::Client;
use tracing::{error, info};
use crate::config::Config;
use crate::error::{AppError, Result};

pub const FALLBACK_REPLY: &str = "Couldn't get a reply.";
const GENERIC_API_ERROR: &str = "API error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

/// Sends the conversation to the completion API and returns the first choice.
///
/// A non-OK upstream status becomes [`AppError::Upstream`] carrying the
/// upstream's `error.message` when it sent one.
pub async fn call_openrouter(
    client: &Client,
    config: &Config,
    messages: &[ChatMessage],
) -> Result<String> {
    let body = ChatRequest {
        model: &config.model,
        messages,
        max_tokens: config.max_tokens,
    };

    let res = client
        .post(&config.completions_url)
        .bearer_auth(&config.openrouter_api_key)
        .header("HTTP-Referer", &config.referer)
        .header("X-Title", &config.app_title)
        .json(&body)
        .send()
        .await?;

    let status = res.status();
    let raw = res.text().await?;
    let json = serde_json::from_str::<serde_json::Value>(&raw);

    if !status.is_success() {
        error!(status = status.as_u16(), body = %raw, "OpenRouter error");
        let message = json
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| GENERIC_API_ERROR.to_string());
        return Err(AppError::Upstream { status: status.as_u16(), message });
    }

    let json = json.map_err(|e| AppError::Internal(format!("Invalid response format from LLM: {}", e)))?;
    let reply = json["choices"][0]["message"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_REPLY)
        .to_string();

    info!(model = %config.model, reply_chars = reply.len(), "Completion received");
    Ok(reply)
}
