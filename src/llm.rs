//! Chat model integration.
//!
//! [`ChatBackend`] is the seam to the hosted language model. Two
//! implementations:
//! - **openai** — `POST /v1/chat/completions`, keyed by `OPENAI_API_KEY`.
//! - **ollama** — `POST /api/chat` on a local Ollama instance.
//!
//! Same retry discipline as the embedding layer: 429/5xx and network
//! errors retried with exponential backoff, other 4xx fail fast, every
//! request bounded by the configured timeout. A generation failure is
//! surfaced to the caller; it never terminates the session.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::config::LlmConfig;

/// A single message in the conversation sent to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Synchronous-from-the-caller's-view chat completion.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate the assistant's reply to the given message sequence.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Instantiate the backend named by the configuration.
pub fn create_backend(config: &LlmConfig) -> Result<Box<dyn ChatBackend>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiChat::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config))),
        other => bail!("Unknown llm provider: {}", other),
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Shared retry loop: retry 429/5xx and network errors with backoff,
/// fail fast on other client errors.
async fn post_with_retry(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, String)],
    body: &serde_json::Value,
    max_retries: u32,
    provider: &str,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut req = client.post(url).header("Content-Type", "application/json");
        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }

        match req.json(body).send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "{} chat error {}: {}",
                        provider,
                        status,
                        body_text
                    ));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("{} chat error {}: {}", provider, status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!("{} connection error: {}", provider, e));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} chat failed after retries", provider)))
}

// ============ OpenAI ============

pub struct OpenAiChat {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let base_url = config
            .url
            .as_deref()
            .unwrap_or("https://api.openai.com")
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let client = build_client(self.timeout_secs)?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let json = post_with_retry(
            &client,
            &format!("{}/v1/chat/completions", self.base_url),
            &[("Authorization", format!("Bearer {}", self.api_key))],
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;

        parse_openai_chat_response(&json)
    }
}

fn parse_openai_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

// ============ Ollama ============

pub struct OllamaChat {
    url: String,
    model: String,
    temperature: f64,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            url: config
                .url
                .as_deref()
                .unwrap_or("http://localhost:11434")
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let client = build_client(self.timeout_secs)?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let json = post_with_retry(
            &client,
            &format!("{}/api/chat", self.url),
            &[],
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;

        parse_ollama_chat_response(&json)
    }
}

fn parse_ollama_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let msg = ChatMessage::system("ground rules");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "ground rules");
        assert_eq!(
            serde_json::to_value(ChatMessage::assistant("hi")).unwrap()["role"],
            "assistant"
        );
    }

    #[test]
    fn parse_openai_chat_shape() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "the answer"}}]
        });
        assert_eq!(parse_openai_chat_response(&json).unwrap(), "the answer");
        assert!(parse_openai_chat_response(&serde_json::json!({"choices": []})).is_err());
    }

    #[test]
    fn parse_ollama_chat_shape() {
        let json = serde_json::json!({"message": {"role": "assistant", "content": "the answer"}});
        assert_eq!(parse_ollama_chat_response(&json).unwrap(), "the answer");
        assert!(parse_ollama_chat_response(&serde_json::json!({})).is_err());
    }
}
