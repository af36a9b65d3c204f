//! LLM client — the single point of entry for all OpenAI API calls in
//! HouseMatch.
//!
//! ARCHITECTURAL RULE: No other module may call the OpenAI API directly.
//! All model interactions MUST go through this module.
//!
//! Model: gpt-4o (hardcoded — do not make configurable to prevent drift)

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// The model used for all LLM calls in HouseMatch.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gpt-4o";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API authentication failed (status {status})")]
    Auth { status: u16 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned an empty completion")]
    EmptyCompletion,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    /// Extracts the assistant text from the first choice.
    fn text(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// The single LLM client used by all services in HouseMatch.
/// Wraps the OpenAI Chat Completions API.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Sends one system + user message pair and returns the completion text.
    ///
    /// Makes exactly one attempt: there is no retry loop. A failed generation
    /// surfaces immediately and the caller resubmits if they want another run.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: MODEL,
            temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(LlmError::Auth {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse the provider's error envelope
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        if let Some(usage) = &chat_response.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        let text = chat_response.text().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(LlmError::EmptyCompletion);
        }

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest {
            model: MODEL,
            temperature: 0.3,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "Eres un valuador",
                },
                ChatMessage {
                    role: "user",
                    content: "--- COMPARABLE 1 ---",
                },
            ],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["temperature"], 0.3);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], "Eres un valuador");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "--- COMPARABLE 1 ---");
    }

    #[test]
    fn test_chat_response_extracts_first_choice() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text(), Some("{\"ok\": true}"));
    }

    #[test]
    fn test_chat_response_without_content() {
        let body = r#"{"choices": [{"message": {"role": "assistant"}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text(), None);
    }

    #[test]
    fn test_error_envelope_message_is_extracted() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#;
        let parsed: OpenAiError = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Rate limit reached");
    }
}
