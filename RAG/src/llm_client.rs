use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RagError, Result};
use crate::models::HistoryTurn;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

pub struct Completion {
    pub answer: String,
    pub model: String,
    pub usage: Option<Usage>,
}

/// Client for an OpenAI-compatible chat-completions gateway.
pub struct LlmClient {
    client: Client,
    api_key: String,
    default_model: String,
}

impl LlmClient {
    pub fn new(api_key: String, default_model: String) -> Self {
        LlmClient {
            client: Client::new(),
            api_key,
            default_model,
        }
    }

    pub async fn complete(&self, system_prompt: &str, user_message: &str, history: &[HistoryTurn], model: Option<&str>) -> Result<Completion> {
        let model = model.unwrap_or(&self.default_model);

        let mut messages = vec![ChatMessage {
            role: "system",
            content: system_prompt,
        }];
        for turn in history {
            messages.push(ChatMessage {
                role: &turn.role,
                content: &turn.content,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user_message,
        });

        let request = ChatRequest {
            model,
            messages,
            temperature: 0.2,
            top_p: 0.9,
            max_tokens: 1000,
            stream: false,
        };

        let response = self
            .client
            .post("https://openrouter.ai/api/v1/chat/completions")
            .timeout(Duration::from_secs(120))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://rag-core.local")
            .header("X-Title", "Document RAG Q&A System")
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::UpstreamLlm {
                operation: "complete".into(),
                status: None,
                cause: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::UpstreamLlm {
                operation: "complete".into(),
                status: Some(status.as_u16()),
                cause: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| RagError::UpstreamLlm {
            operation: "complete".into(),
            status: Some(status.as_u16()),
            cause: e.to_string(),
        })?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RagError::UpstreamLlm {
                operation: "complete".into(),
                status: Some(status.as_u16()),
                cause: "no choices in response".into(),
            })?;

        if let Some(usage) = &parsed.usage {
            log::debug!(
                "LLM usage: prompt={} completion={} total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        Ok(Completion {
            answer,
            model: model.to_string(),
            usage: parsed.usage,
        })
    }

    pub fn default_model_name(&self) -> String {
        self.default_model.clone()
    }

    pub async fn test_connection(&self) -> Result<()> {
        self.complete("You are a connectivity probe.", "ping", &[], None)
            .await
            .map(|_| ())
    }
}
