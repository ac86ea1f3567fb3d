// src/generator.rs
//! Answer generator: provider abstraction over a chat-completions API.
//!
//! * `OpenAiGenerator` talks to the real API.
//! * `MockGenerator` returns deterministic text (selected with `AI_TEST_MODE=mock`).
//! * `DisabledGenerator` fails every call; legal sources are then skipped and
//!   the general path reports an internal error.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ai::AiConfig;
use crate::session::{ChatMessage, Role};

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";

/// One generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generated text, trimmed. Any failure is an error; callers decide whether to skip.
    async fn generate(&self, request: GenerationRequest) -> anyhow::Result<String>;
    fn provider_name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn AnswerGenerator>;

/// Factory following config and environment.
///
/// * `AI_TEST_MODE=mock` → `MockGenerator`
/// * disabled config → `DisabledGenerator`
/// * `openai` → `OpenAiGenerator`
pub fn build_generator(config: &AiConfig) -> anyhow::Result<DynGenerator> {
    if std::env::var(ENV_AI_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockGenerator::default()));
    }

    if !config.enabled {
        return Ok(Arc::new(DisabledGenerator));
    }

    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::from_config(config)?)),
        other => bail!("unsupported generator provider: {other}"),
    }
}

pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiGenerator {
    pub fn from_config(config: &AiConfig) -> anyhow::Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("generator enabled without an API key");
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("agente-planificacion/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: OPENAI_CHAT_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    async fn generate(&self, request: GenerationRequest) -> anyhow::Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("chat completion returned HTTP {status}");
        }

        let parsed: CompletionResponse = resp.json().await.context("chat completion body")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(anyhow!("chat completion returned no content"));
        }
        Ok(content)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Deterministic offline generator. Replies quote the last user message and
/// are always long enough to be kept by the legal pipeline.
#[derive(Default)]
pub struct MockGenerator {
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerGenerator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let excerpt: String = last_user.chars().take(80).collect();
        Ok(format!(
            "Respuesta simulada del Agente de Planificación ({} mensajes): {}",
            request.messages.len(),
            excerpt
        ))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub struct DisabledGenerator;

#[async_trait]
impl AnswerGenerator for DisabledGenerator {
    async fn generate(&self, _request: GenerationRequest) -> anyhow::Result<String> {
        Err(anyhow!("answer generator is disabled"))
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_is_deterministic_and_long_enough() {
        let g = MockGenerator::default();
        let req = GenerationRequest::new(vec![
            ChatMessage::system("s"),
            ChatMessage::user("¿Qué es un permiso único?"),
        ])
        .temperature(0.1);
        let a = g.generate(req.clone()).await.unwrap();
        let b = g.generate(req).await.unwrap();
        assert_eq!(a, b);
        assert!(a.chars().count() > 50);
        assert!(a.contains("permiso único"));
        assert_eq!(g.calls(), 2);
    }

    #[tokio::test]
    async fn disabled_always_fails() {
        let g = DisabledGenerator;
        assert!(g.generate(GenerationRequest::new(vec![])).await.is_err());
        assert_eq!(g.provider_name(), "disabled");
    }

    #[test]
    #[serial_test::serial]
    fn factory_respects_config_and_mock_mode() {
        std::env::remove_var(ENV_AI_TEST_MODE);
        let disabled = build_generator(&AiConfig::default()).unwrap();
        assert_eq!(disabled.provider_name(), "disabled");

        let cfg = AiConfig {
            enabled: true,
            api_key: "sk-test".into(),
            ..AiConfig::default()
        };
        assert_eq!(build_generator(&cfg).unwrap().provider_name(), "openai");

        let no_key = AiConfig {
            enabled: true,
            ..AiConfig::default()
        };
        assert!(build_generator(&no_key).is_err());

        std::env::set_var(ENV_AI_TEST_MODE, "mock");
        assert_eq!(build_generator(&no_key).unwrap().provider_name(), "mock");
        std::env::remove_var(ENV_AI_TEST_MODE);
    }

    #[test]
    fn request_body_omits_unset_fields() {
        let msgs = vec![ChatMessage::user("hola")];
        let body = CompletionRequest {
            model: "gpt-4o",
            messages: &msgs,
            temperature: None,
            max_tokens: Some(1500),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 1500);
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
