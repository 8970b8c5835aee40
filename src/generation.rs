//! Language-model providers for the answer step.
//!
//! Each provider turns the question and labelled context strings into chat
//! messages with [`PromptBuilder`] and returns the model's reply text.
//! Transient failures are retried the same way as embedding calls.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use context_gate_core::generate::Generator;
use context_gate_core::prompt::PromptBuilder;

use crate::config::GenerationConfig;
use crate::http::post_json_with_retry;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Fails every call. Selected when `[generation].provider = "disabled"`.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _question: &str, _context: &[String]) -> Result<String> {
        bail!("Generation provider is disabled; set [generation].provider in the config")
    }
}

/// Model settings shared by the chat providers.
struct ChatSettings {
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    prompt: PromptBuilder,
    client: reqwest::Client,
}

impl ChatSettings {
    fn from_config(config: &GenerationConfig, provider: &str) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for {} provider", provider))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            prompt: PromptBuilder::new(config.system_prompt.as_deref()),
            client,
        })
    }
}

/// `POST /v1/chat/completions`. Requires `OPENAI_API_KEY`.
pub struct OpenAiGenerator {
    settings: ChatSettings,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let settings = ChatSettings::from_config(config, "OpenAI")?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self { settings, api_key })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, question: &str, context: &[String]) -> Result<String> {
        let s = &self.settings;
        let body = serde_json::json!({
            "model": s.model,
            "messages": s.prompt.build_messages(question, context),
            "temperature": s.temperature,
            "max_tokens": s.max_tokens,
        });
        let json = post_json_with_retry(
            &s.client,
            OPENAI_CHAT_URL,
            Some(&self.api_key),
            &body,
            s.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_reply(&json)
    }
}

fn parse_openai_reply(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

/// `POST /api/chat` on a local Ollama instance, non-streaming.
pub struct OllamaGenerator {
    settings: ChatSettings,
    url: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let settings = ChatSettings::from_config(config, "Ollama")?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        Ok(Self { settings, url })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, question: &str, context: &[String]) -> Result<String> {
        let s = &self.settings;
        let body = serde_json::json!({
            "model": s.model,
            "messages": s.prompt.build_messages(question, context),
            "stream": false,
            "options": {
                "temperature": s.temperature,
                "num_predict": s.max_tokens,
            },
        });
        let endpoint = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let json =
            post_json_with_retry(&s.client, &endpoint, None, &body, s.max_retries, "Ollama")
                .await?;
        parse_ollama_reply(&json)
    }
}

fn parse_ollama_reply(json: &serde_json::Value) -> Result<String> {
    json.pointer("/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))
}

pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAiGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_reply() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Thirty days.\n" } }]
        });
        assert_eq!(parse_openai_reply(&json).unwrap(), "Thirty days.");
        assert!(parse_openai_reply(&serde_json::json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_parse_ollama_reply() {
        let json = serde_json::json!({ "message": { "role": "assistant", "content": "Yes." }, "done": true });
        assert_eq!(parse_ollama_reply(&json).unwrap(), "Yes.");
    }

    #[tokio::test]
    async fn test_disabled_generator_errors() {
        let generator = create_generator(&GenerationConfig::default()).unwrap();
        assert_eq!(generator.model_name(), "disabled");
        assert!(generator.generate("q", &[]).await.is_err());
    }

    #[test]
    fn test_ollama_generator_requires_model() {
        let config = GenerationConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        assert!(OllamaGenerator::new(&config).is_err());
    }
}
