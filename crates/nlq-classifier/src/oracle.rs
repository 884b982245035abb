//! The AI oracle seam and its OpenAI-backed implementation

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Request(#[from] async_openai::error::OpenAIError),

    #[error("oracle returned an empty response")]
    EmptyResponse,

    #[error("oracle returned non-JSON output: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Opaque classification backend. May fail, may return arbitrary JSON; the
/// classifier defends against both. One request per call — retries are the
/// caller's concern.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    async fn classify_raw(
        &self,
        system_prompt: &str,
        question: &str,
    ) -> Result<serde_json::Value, OracleError>;
}

/// Oracle configuration.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub model: String,
}

impl OracleConfig {
    /// Read model selection from `OPENAI_MODEL`, defaulting to gpt-4o-mini.
    pub fn from_env() -> Self {
        Self {
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Production oracle backed by the OpenAI chat-completions API.
pub struct OpenAiOracle {
    client: Client<OpenAIConfig>,
    config: OracleConfig,
}

impl OpenAiOracle {
    pub fn new(client: Client<OpenAIConfig>, config: OracleConfig) -> Self {
        Self { client, config }
    }

    /// Build a client from `OPENAI_API_KEY` (and optionally `OPENAI_MODEL`).
    pub fn from_env() -> Result<Self, OracleError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OracleError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
        Ok(Self::new(client, OracleConfig::from_env()))
    }
}

#[async_trait]
impl ClassificationOracle for OpenAiOracle {
    async fn classify_raw(
        &self,
        system_prompt: &str,
        question: &str,
    ) -> Result<serde_json::Value, OracleError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(question)
                    .build()?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.config.model.clone())
            .messages(messages)
            .temperature(0.0) // Deterministic output
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .ok_or(OracleError::EmptyResponse)?;

        tracing::debug!(response = %content, "oracle response");

        Ok(serde_json::from_str(content)?)
    }
}
