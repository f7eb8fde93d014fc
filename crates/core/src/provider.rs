//! Provider trait — the abstraction over streaming LLM backends.
//!
//! A Provider turns (model id, message history, system prompt, optional
//! images) into a lazy sequence of text fragments. The stream is finite,
//! single-pass, and not restartable; it may fail mid-flight.
//!
//! Implementations: Anthropic native, OpenAI-compatible endpoints.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The role of a chat message sent to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message in a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A base64-encoded image offered to vision-capable models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Base64-encoded image bytes (no data-URI prefix)
    pub base64: String,

    /// MIME type, e.g. "image/png"
    pub media_type: String,
}

/// A request for one streamed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514", "gpt-4o")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<ChatMessage>,

    /// Optional system prompt (sent the way each backend expects)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Image attachments for vision-capable models
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
}

impl GenerateRequest {
    /// A single-user-message request, the common case for debate turns.
    pub fn prompt(
        model: impl Into<String>,
        context: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(context)],
            system_prompt: Some(system_prompt.into()),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The orchestrator calls
/// `generate_stream()` without knowing which provider is being used —
/// pure polymorphism.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable provider id (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Send a request and receive a stream of text fragments.
    ///
    /// Each item is one chunk of generated text; the channel closing marks
    /// the end of the stream. An `Err` item means the stream failed and no
    /// further items will arrive.
    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<String, ProviderError>>,
        ProviderError,
    >;

    /// Send a request and collect the full response text.
    ///
    /// Default implementation drains `generate_stream()`. Used where the
    /// caller needs the complete output (agreement check, fact extraction).
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<String, ProviderError> {
        let mut rx = self.generate_stream(request).await?;
        let mut full = String::new();
        while let Some(chunk) = rx.recv().await {
            full.push_str(&chunk?);
        }
        Ok(full)
    }

    /// Verify the credential is valid — a minimal request to the backend.
    async fn test_connection(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }

    /// List available models for this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}
