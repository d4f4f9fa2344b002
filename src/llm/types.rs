use serde::{Deserialize, Serialize};

/// Wire protocol spoken by a backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// `POST /api/generate`, newline-delimited JSON reply (local model server)
    Generate,
    /// `POST /chat/completions`, single JSON object reply (cloud providers)
    ChatCompletions,
}

impl WireFormat {
    pub fn generation_path(&self) -> &'static str {
        match self {
            WireFormat::Generate => "/api/generate",
            WireFormat::ChatCompletions => "/chat/completions",
        }
    }

    pub fn probe_path(&self) -> &'static str {
        match self {
            WireFormat::Generate => "/api/tags",
            WireFormat::ChatCompletions => "/models",
        }
    }
}

/// Message role in a chat-completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A message in a chat-completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request body for `POST /chat/completions`
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Request body for `POST /api/generate`
#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

/// The summary returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiResponse {
    /// Markdown text
    pub text: String,
    /// Name of the provider that produced it
    pub provider: String,
}
