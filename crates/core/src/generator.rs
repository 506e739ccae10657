use async_trait::async_trait;
use lawguide_common::{LawGuideError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// System and user turns sent to the chat backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// One completion for `request`. Implementations make a single attempt.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub api_base: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "llama3-70b-8192".to_string(),
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl GenerationConfig {
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(LawGuideError::Configuration("generation model is required".to_string()));
        }
        if self.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(LawGuideError::Configuration(
                "generation API key is required (set GROQ_API_KEY or generation.api_key)".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LawGuideError::Configuration(format!(
                "generation temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(LawGuideError::Configuration("generation max_tokens must be greater than zero".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(LawGuideError::Configuration("generation timeout_secs must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat-completions client for Groq or any OpenAI-compatible endpoint.
pub struct ChatCompletionGenerator {
    config: GenerationConfig,
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl ChatCompletionGenerator {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LawGuideError::Configuration("generation API key not configured".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .build()
            .map_err(|e| LawGuideError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = format!("{}/chat/completions", config.api_base.trim_end_matches('/'));
        info!("Generation backend: {} at {}", config.model, endpoint);

        Ok(Self {
            config,
            api_key,
            endpoint,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!("Requesting completion from {} ({} prompt chars)", self.config.model, request.user.len());

        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user }
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LawGuideError::GenerationUnavailable(format!("completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LawGuideError::GenerationUnavailable(format!(
                "completion API returned {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LawGuideError::GenerationUnavailable(format!("Failed to parse completion response: {}", e)))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LawGuideError::GenerationUnavailable("completion contained no text".to_string()))?;

        debug!("Completion received: {} chars", text.len());
        Ok(text)
    }
}
