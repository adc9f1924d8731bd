//! Reqwest-based client for OpenAI-compatible Chat Completions, used as the
//! primary (least reliable, most helpful) data producer.

use anyhow::Context as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::Config,
    error::{Error, Result},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_key = cfg.require("OPENAI_API_KEY")?;
        let api_base_url = cfg.get("API_BASE_URL").unwrap_or_else(|| "default".into());
        let base_url = normalize_base_url(&api_base_url);
        let model = cfg.get("DEFAULT_MODEL").unwrap_or_else(|| "gpt-4o-mini".into());

        let http = reqwest::Client::builder().timeout(cfg.request_timeout()).build()?;

        Ok(Self { http, base_url, api_key, model })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> ChatOptions {
        ChatOptions { model: self.model.clone(), temperature: 0.0, max_tokens: Some(1024) }
    }

    pub async fn complete(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| Error::Config(format!("invalid OPENAI_API_KEY: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        let mut body = serde_json::json!({
            "model": opts.model,
            "temperature": opts.temperature,
            "messages": messages,
        });
        if let Some(max) = opts.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }

        let resp = self.http.post(url).headers(headers).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Model(format!("LLM error: {}", resp.status())));
        }

        let completion: Completion = resp.json().await?;
        completion
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Model("empty completion".into()))
    }

    /// Asks for a JSON answer and parses it, tolerating Markdown code fences.
    pub async fn complete_json(&self, system: &str, user: &str) -> Result<Value> {
        let messages = [ChatMessage::new(Role::System, system), ChatMessage::new(Role::User, user)];
        let text = self.complete(&messages, &self.options()).await?;
        parse_json_reply(&text).map_err(|e| Error::Model(format!("{e:#}")))
    }
}

fn normalize_base_url(api_base_url: &str) -> String {
    if api_base_url == "default" {
        return "https://api.openai.com/v1".to_string();
    }
    let trimmed = api_base_url.trim_end_matches('/');
    if !trimmed.ends_with("/v1") && !trimmed.contains("/v1/") {
        format!("{}/v1", trimmed)
    } else {
        trimmed.to_string()
    }
}

fn parse_json_reply(text: &str) -> anyhow::Result<Value> {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string (```json) and the closing fence.
        body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
        body = body.trim_end().trim_end_matches("```");
    }
    serde_json::from_str(body.trim()).context("model reply is not valid JSON")
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
