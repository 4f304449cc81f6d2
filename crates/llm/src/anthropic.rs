//! Anthropic Messages API adapter for ticket generation.

use async_trait::async_trait;
use pipeline::{LlemyError, LlmConfig, TicketGenerator};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Builds the single user message sent for one plan document.
pub fn generation_prompt(policy: &str, plan_document: &str) -> String {
    format!(
        "{policy}\n\n---\n\nHere is the plan file to process:\n\n{plan_document}\n\n---\n\n\
         Please generate the LLEMY_TODO_ISSUE following the exact format specified in the \
         CLAUDE.md policy."
    )
}

/// [`TicketGenerator`] calling `POST {base_url}/v1/messages`.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Creates a client from the LLM configuration.
    ///
    /// # Errors
    ///
    /// [`LlemyError::Configuration`] when no API key is configured.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlemyError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlemyError::Configuration {
                message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
            })?;
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// The model this client requests.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TicketGenerator for AnthropicClient {
    async fn generate(&self, policy: &str, plan_document: &str) -> Result<String, LlemyError> {
        let prompt = generation_prompt(policy, plan_document);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: &prompt,
            }],
        };

        let url = format!("{}/v1/messages", self.base_url);
        debug!(%url, model = %self.model, prompt_bytes = prompt.len(), "Calling Messages API");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlemyError::LlmProvider {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlemyError::LlmProvider {
            message: format!("failed to read response: {e}"),
        })?;

        if status != reqwest::StatusCode::OK {
            return Err(LlemyError::LlmProvider {
                message: format!("{} {body}", status.as_u16()),
            });
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| LlemyError::LlmProvider {
                message: format!("failed to parse response: {e}"),
            })?;

        let text = parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| LlemyError::LlmProvider {
                message: "invalid response format".to_string(),
            })?;

        info!(model = %self.model, chars = text.len(), "Generated todo document");
        Ok(text)
    }
}
