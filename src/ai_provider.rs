use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AIProvider {
    OpenAI,
    Ollama,
}

impl std::fmt::Display for AIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AIProvider::OpenAI => write!(f, "openai"),
            AIProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for AIProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Ok(AIProvider::OpenAI),
            "ollama" => Ok(AIProvider::Ollama),
            _ => Err(anyhow!("Unknown AI provider: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIConfig {
    pub provider: AIProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for AIConfig {
    fn default() -> Self {
        AIConfig {
            provider: AIProvider::Ollama,
            model: "qwen2.5".to_string(),
            api_key: None,
            base_url: Some(OLLAMA_BASE_URL.to_string()),
            max_tokens: Some(1024),
            temperature: Some(0.7),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
    pub model: String,
}

pub struct AIProviderClient {
    config: AIConfig,
    http_client: reqwest::Client,
}

impl AIProviderClient {
    pub fn new(config: AIConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(AIProviderClient {
            config,
            http_client,
        })
    }

    /// Ask for a JSON object and deserialize it
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        prompt: String,
        system_prompt: Option<String>,
    ) -> Result<T> {
        let response = self
            .send(vec![ChatMessage::user(prompt)], system_prompt)
            .await?;

        debug!(
            model = %response.model,
            tokens = ?response.tokens_used,
            "structured completion received"
        );

        parse_json_content(&response.content)
    }

    pub fn get_model(&self) -> &str {
        &self.config.model
    }

    pub fn get_provider(&self) -> AIProvider {
        self.config.provider
    }

    async fn send(
        &self,
        messages: Vec<ChatMessage>,
        system_prompt: Option<String>,
    ) -> Result<ChatResponse> {
        match self.config.provider {
            AIProvider::OpenAI => self.chat_openai(messages, system_prompt).await,
            AIProvider::Ollama => self.chat_ollama(messages, system_prompt).await,
        }
    }

    async fn chat_openai(
        &self,
        messages: Vec<ChatMessage>,
        system_prompt: Option<String>,
    ) -> Result<ChatResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("OpenAI API key required"))?;

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": request_messages(messages, system_prompt),
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" }
        });

        let base_url = self.config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("OpenAI API error ({}): {}", status, error_text));
        }

        let response_json: serde_json::Value = response.json().await?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("Invalid OpenAI response format"))?
            .to_string();

        let tokens_used = response_json["usage"]["total_tokens"]
            .as_u64()
            .map(|t| t as u32);

        Ok(ChatResponse {
            content,
            tokens_used,
            model: self.config.model.clone(),
        })
    }

    async fn chat_ollama(
        &self,
        messages: Vec<ChatMessage>,
        system_prompt: Option<String>,
    ) -> Result<ChatResponse> {
        let base_url = self.config.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL);

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": request_messages(messages, system_prompt),
            "stream": false,
            "format": "json",
            "options": {
                "temperature": self.config.temperature
            }
        });

        let url = format!("{}/api/chat", base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Ollama API error ({}): {}", status, error_text));
        }

        let response_json: serde_json::Value = response.json().await?;

        let content = response_json["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("Invalid Ollama response format"))?
            .to_string();

        let tokens_used = response_json["eval_count"].as_u64().map(|t| t as u32);

        Ok(ChatResponse {
            content,
            tokens_used,
            model: self.config.model.clone(),
        })
    }
}

fn request_messages(
    messages: Vec<ChatMessage>,
    system_prompt: Option<String>,
) -> Vec<serde_json::Value> {
    let system = system_prompt.map(ChatMessage::system);
    system
        .into_iter()
        .chain(messages)
        .map(|msg| {
            serde_json::json!({
                "role": msg.role,
                "content": msg.content
            })
        })
        .collect()
}

/// Models sometimes wrap JSON in a markdown fence; strip it before parsing
pub fn parse_json_content<T: DeserializeOwned>(content: &str) -> Result<T> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body).with_context(|| {
        let preview: String = body.chars().take(200).collect();
        format!("Malformed model output: {}", preview)
    })
}
