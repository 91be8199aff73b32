//! Chat completion reply generator over `POST /chat/completions`.
//!
//! The stored history only ever holds user and assistant turns. The system
//! instruction that keeps replies short is prepended here, on the outgoing request,
//! and never written back anywhere.

use crate::services::{OpenAiClient, ReplyGenerator, ServiceError};
use crate::session::History;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const SYSTEM_PROMPT: &str =
    "You are a concise voice assistant. Limit responses to 2 sentences.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn build_request<'a>(model: &'a str, history: &'a History) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage {
        role: "system",
        content: SYSTEM_PROMPT,
    });
    messages.extend(history.turns().iter().map(|turn| ChatMessage {
        role: turn.role.as_str(),
        content: &turn.content,
    }));

    ChatRequest { model, messages }
}

/// Only the first choice is used; no selection among alternatives.
fn first_reply(response: ChatResponse) -> Result<String, ServiceError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ServiceError::EmptyResponse("chat completion"))
}

pub struct OpenAiReplyGenerator {
    client: OpenAiClient,
    model: String,
}

impl OpenAiReplyGenerator {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiReplyGenerator {
    async fn generate(&self, history: &History) -> Result<String, ServiceError> {
        debug!(turns = history.len(), model = %self.model, "Requesting chat completion");

        let request = self
            .client
            .post("chat/completions")
            .json(&build_request(&self.model, history));

        let response: ChatResponse = self
            .client
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        let reply = first_reply(response)?;
        info!(chars = reply.len(), "Reply generated");
        Ok(reply)
    }
}
