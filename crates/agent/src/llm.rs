use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use talentscout_core::config::{LlmConfig, LlmProvider};
use thiserror::Error;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const SYSTEM_PROMPT: &str = "You are TalentScout's hiring assistant. You write concise, practical \
technical screening questions for software candidates. Follow the output format you are given \
exactly and add nothing else.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm provider is disabled")]
    Disabled,
    #[error("llm request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("could not decode llm response: {0}")]
    Decode(String),
    #[error("llm returned empty content")]
    EmptyContent,
}

impl LlmError {
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout { timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX) }
    }
}

/// Text completion with a caller-supplied deadline.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError>;
}

#[derive(Clone, Debug, Default)]
pub struct DisabledLlmClient;

#[async_trait]
impl LlmClient for DisabledLlmClient {
    fn provider(&self) -> &'static str {
        LlmProvider::Disabled.as_str()
    }

    async fn complete(&self, _prompt: &str, _timeout: Duration) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.provider {
        LlmProvider::Disabled => Ok(Arc::new(DisabledLlmClient)),
        _ => Ok(Arc::new(HttpLlmClient::from_config(config)?)),
    }
}

/// One client for the OpenAI chat-completions, Anthropic messages, and Ollama
/// generate endpoints. No retries: a failed call falls back to static questions.
#[derive(Clone)]
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl std::fmt::Debug for HttpLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLlmClient")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Http(error.to_string()))?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            provider: config.provider,
            api_key: config.api_key.clone(),
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn send(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        match self.provider {
            LlmProvider::Disabled => Err(LlmError::Disabled),
            LlmProvider::OpenAi => self.send_openai(prompt, timeout).await,
            LlmProvider::Anthropic => self.send_anthropic(prompt, timeout).await,
            LlmProvider::Ollama => self.send_ollama(prompt, timeout).await,
        }
    }

    async fn send_openai(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let mut request =
            self.client.post(format!("{}/chat/completions", self.base_url)).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }
        let response = request.json(&body).send().await.map_err(|e| map_reqwest(e, timeout))?;
        let parsed: ChatCompletionResponse = decode(response, timeout).await?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or(LlmError::EmptyContent)
    }

    async fn send_anthropic(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };
        let mut request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .timeout(timeout)
            .header("anthropic-version", ANTHROPIC_VERSION);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key.expose_secret());
        }
        let response = request.json(&body).send().await.map_err(|e| map_reqwest(e, timeout))?;
        let parsed: AnthropicResponse = decode(response, timeout).await?;
        parsed
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .find_map(|block| block.text)
            .ok_or(LlmError::EmptyContent)
    }

    async fn send_ollama(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        let body = OllamaRequest {
            model: &self.model,
            prompt,
            system: SYSTEM_PROMPT,
            stream: false,
            options: OllamaOptions { temperature: self.temperature, num_predict: self.max_tokens },
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest(e, timeout))?;
        let parsed: OllamaResponse = decode(response, timeout).await?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    fn provider(&self) -> &'static str {
        self.provider.as_str()
    }

    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        let text = match tokio::time::timeout(timeout, self.send(prompt, timeout)).await {
            Ok(result) => result?,
            Err(_) => return Err(LlmError::timeout(timeout)),
        };
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text)
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "https://api.openai.com/v1",
        LlmProvider::Anthropic => "https://api.anthropic.com/v1",
        LlmProvider::Ollama => "http://localhost:11434",
        LlmProvider::Disabled => "",
    }
}

fn map_reqwest(error: reqwest::Error, timeout: Duration) -> LlmError {
    if error.is_timeout() {
        LlmError::timeout(timeout)
    } else {
        LlmError::Http(error.to_string())
    }
}

async fn decode<T>(response: reqwest::Response, timeout: Duration) -> Result<T, LlmError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let body = response.text().await.map_err(|e| map_reqwest(e, timeout))?;
    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);
        return Err(LlmError::Api { status: status.as_u16(), message });
    }
    serde_json::from_str(&body).map_err(|error| LlmError::Decode(error.to_string()))
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use talentscout_core::config::{AppConfig, LlmProvider};

    use super::{build_llm_client, DisabledLlmClient, HttpLlmClient, LlmClient, LlmError};

    #[tokio::test]
    async fn disabled_client_never_answers() {
        let result = DisabledLlmClient.complete("anything", Duration::from_secs(1)).await;
        assert_eq!(result, Err(LlmError::Disabled));
    }

    #[test]
    fn builder_picks_client_for_provider() {
        let mut config = AppConfig::default().llm;
        let client = build_llm_client(&config).expect("disabled client");
        assert_eq!(client.provider(), "disabled");

        config.provider = LlmProvider::Ollama;
        config.base_url = Some("http://127.0.0.1:11434/".to_owned());
        let client = build_llm_client(&config).expect("ollama client");
        assert_eq!(client.provider(), "ollama");
    }

    #[test]
    fn debug_output_omits_api_key() {
        let mut config = AppConfig::default().llm;
        config.provider = LlmProvider::OpenAi;
        config.api_key = Some("sk-very-secret".to_owned().into());

        let client = HttpLlmClient::from_config(&config).expect("client");
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("api.openai.com"));
    }

    #[test]
    fn timeout_error_reports_milliseconds() {
        assert_eq!(
            LlmError::timeout(Duration::from_millis(1500)),
            LlmError::Timeout { timeout_ms: 1500 }
        );
    }
}
