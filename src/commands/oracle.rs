//! Scoring oracle adapter.
//!
//! The oracle is an external language model that answers a metric-specific
//! prompt with free text. The pipeline never retries and sets no timeout of
//! its own; model identity and sampling temperature come from settings.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are reviewing the file `{filepath}` for maintainability.\n\
Metric: {metric}\n\
Definition: {description}\n\
\n\
```\n{code}\n```\n\
\n\
Explain your reasoning briefly, then give a score for this metric in the form N/10.";

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: HTTP {status} - {body}")]
    Server { status: u16, body: String },

    #[error("Empty response")]
    EmptyResponse,

    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Everything the oracle sees for one (file, metric) unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPrompt {
    pub filepath: String,
    pub code: String,
    /// Humanized metric name (underscores replaced with spaces).
    pub metric: String,
    pub description: String,
    /// The template rendered with the fields above.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        PromptTemplate {
            template: template.into(),
        }
    }

    pub fn prompt(&self, filepath: &str, code: &str, metric: &str, description: &str) -> ScoringPrompt {
        // `{code}` goes last so placeholder-like text inside the code is left alone.
        let text = self
            .template
            .replace("{filepath}", filepath)
            .replace("{metric}", metric)
            .replace("{description}", description)
            .replace("{code}", code);

        ScoringPrompt {
            filepath: filepath.to_string(),
            code: code.to_string(),
            metric: metric.to_string(),
            description: description.to_string(),
            text,
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_TEMPLATE)
    }
}

#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn invoke(&self, prompt: &ScoringPrompt) -> Result<String, OracleError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible chat completion oracle.
pub struct HttpOracle {
    client: Client,
    config: OracleConfig,
    api_key: Option<String>,
}

impl HttpOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let api_key = std::env::var(&config.api_key_env).ok();
        Ok(HttpOracle {
            client: Client::builder().build()?,
            config,
            api_key,
        })
    }

    fn request_body(&self, prompt: &ScoringPrompt) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.text.clone(),
            }],
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl ScoringOracle for HttpOracle {
    async fn invoke(&self, prompt: &ScoringPrompt) -> Result<String, OracleError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| OracleError::MissingApiKey(self.config.api_key_env.clone()))?;
        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(OracleError::EmptyResponse)
    }
}
