use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, RemoteErrorKind};

/// A remote text-generation endpoint.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_id(&self) -> &str;

    /// Send one prompt; the credential is forwarded to the API unmodified.
    async fn complete(&self, prompt: &str, credential: &str) -> Result<String, RemoteError>;
}

/// Hosted model APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Groq,
    #[value(name = "openai")]
    OpenAi,
    Anthropic,
    #[value(name = "huggingface")]
    HuggingFace,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::Groq => "Groq",
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::HuggingFace => "Hugging Face",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::HuggingFace => "https://router.huggingface.co/hf-inference/models",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Groq => "llama-3.3-70b-versatile",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Anthropic => "claude-sonnet-4-6",
            Provider::HuggingFace => "facebook/bart-large-cnn",
        }
    }

    /// Environment variables checked for a credential, in order
    pub fn credential_env_vars(self) -> &'static [&'static str] {
        match self {
            Provider::Groq => &["GROQ_API_KEY"],
            Provider::OpenAi => &["OPENAI_API_KEY"],
            Provider::Anthropic => &["ANTHROPIC_API_KEY"],
            Provider::HuggingFace => &["HF_API_KEY", "HUGGINGFACEHUB_API_TOKEN", "HF_TOKEN"],
        }
    }

    /// Pick the credential: an explicit key first, then the first non-blank
    /// env var in `credential_env_vars` order. Empty when nothing is set.
    pub fn credential(self, explicit: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> String {
        if let Some(key) = explicit {
            return key.to_string();
        }
        self.credential_env_vars()
            .iter()
            .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()))
            .unwrap_or_default()
    }
}

/// Sampling parameters and endpoint settings for model calls
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 600,
            base_url: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// `LanguageModel` backed by one of the hosted APIs
pub struct RemoteModel {
    client: reqwest::Client,
    provider: Provider,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl RemoteModel {
    pub fn new(provider: Provider, model: &str, generation: &GenerationConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(generation.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client, provider, model, generation))
    }

    pub fn with_client(client: reqwest::Client, provider: Provider, model: &str, generation: &GenerationConfig) -> Self {
        let base_url = generation
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string());
        Self {
            client,
            provider,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: generation.temperature,
            max_tokens: generation.max_tokens,
        }
    }

    async fn complete_chat(&self, prompt: &str, credential: &str) -> Result<String, RemoteError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await?;

        let json = self.read_json(resp).await?;
        extract_openai_text(&json)
    }

    async fn complete_anthropic(&self, prompt: &str, credential: &str) -> Result<String, RemoteError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", credential)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let json = self.read_json(resp).await?;
        extract_anthropic_text(&json)
    }

    async fn complete_huggingface(&self, prompt: &str, credential: &str) -> Result<String, RemoteError> {
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "temperature": self.temperature,
                "max_new_tokens": self.max_tokens
            },
            "options": {
                "wait_for_model": true
            }
        });

        let resp = self
            .client
            .post(format!("{}/{}", self.base_url, self.model))
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await?;

        let json = self.read_json(resp).await?;
        extract_huggingface_text(&json)
    }

    async fn read_json(&self, resp: reqwest::Response) -> Result<serde_json::Value, RemoteError> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(self.provider.name(), status, &body));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl LanguageModel for RemoteModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, credential: &str) -> Result<String, RemoteError> {
        debug!(
            "Calling {} model {} ({} prompt chars)",
            self.provider.name(),
            self.model,
            prompt.chars().count()
        );
        match self.provider {
            Provider::Groq | Provider::OpenAi => self.complete_chat(prompt, credential).await,
            Provider::Anthropic => self.complete_anthropic(prompt, credential).await,
            Provider::HuggingFace => self.complete_huggingface(prompt, credential).await,
        }
    }
}

fn bad_response(msg: &str) -> RemoteError {
    RemoteError::new(RemoteErrorKind::BadResponse, msg)
}

fn extract_anthropic_text(json: &serde_json::Value) -> Result<String, RemoteError> {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter_map(|block| {
                if block.get("type")?.as_str()? == "text" {
                    block.get("text")?.as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    Err(bad_response("unexpected Anthropic API response format"))
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String, RemoteError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| bad_response("unexpected chat completion response format"))
}

/// Inference responses are a list of `{generated_text}` or `{summary_text}`
/// objects, depending on the model's task.
fn extract_huggingface_text(json: &serde_json::Value) -> Result<String, RemoteError> {
    if let Some(msg) = json.get("error").and_then(|e| e.as_str()) {
        return Err(RemoteError::new(RemoteErrorKind::Other, format!("Hugging Face API error: {msg}")));
    }
    let first = json.as_array().and_then(|a| a.first()).unwrap_or(json);
    ["generated_text", "summary_text"]
        .iter()
        .find_map(|key| first.get(key).and_then(|t| t.as_str()))
        .map(|t| t.to_string())
        .ok_or_else(|| bad_response("unexpected Hugging Face API response format"))
}
