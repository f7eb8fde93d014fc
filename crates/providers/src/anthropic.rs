//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy).
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Image attachments as base64 content blocks on the first user message
//! - Streaming via SSE with `content_block_delta` events

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::error::ProviderError;
use parley_core::provider::{ChatMessage, ChatRole, GenerateRequest, ImageAttachment, Provider};
use serde::Serialize;
use tracing::{debug, trace, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert messages to Anthropic API format.
    ///
    /// Image attachments become base64 content blocks on the first user
    /// message, ahead of its text.
    fn to_api_messages(
        messages: &[ChatMessage],
        images: &[ImageAttachment],
    ) -> Vec<ApiMessage> {
        let mut result = Vec::new();
        let mut images_pending = !images.is_empty();

        for msg in messages {
            let role = match msg.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
                // System content travels as a top-level field
                ChatRole::System => continue,
            };

            let content = if role == "user" && images_pending {
                images_pending = false;
                let mut blocks: Vec<ContentBlock> = images
                    .iter()
                    .map(|img| ContentBlock::Image {
                        source: ImageSource {
                            r#type: "base64".into(),
                            media_type: img.media_type.clone(),
                            data: img.base64.clone(),
                        },
                    })
                    .collect();
                blocks.push(ContentBlock::Text {
                    text: msg.content.clone(),
                });
                ApiContent::Blocks(blocks)
            } else {
                ApiContent::Text(msg.content.clone())
            };

            result.push(ApiMessage {
                role: role.into(),
                content,
            });
        }

        result
    }

    fn request_body(&self, request: &GenerateRequest, stream: bool) -> serde_json::Value {
        let api_messages = Self::to_api_messages(&request.messages, &request.images);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": api_messages,
            "max_tokens": DEFAULT_MAX_TOKENS,
        });

        if stream {
            body["stream"] = serde_json::json!(true);
        }

        if let Some(ref sys) = request.system_prompt {
            if !sys.is_empty() {
                body["system"] = serde_json::json!(sys);
            }
        }

        body
    }

    fn classify_status(status: u16, error_body: String) -> ProviderError {
        match status {
            429 => ProviderError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => {
                ProviderError::AuthenticationFailed("Invalid Anthropic API key".into())
            }
            _ => ProviderError::ApiError {
                status_code: status,
                message: error_body,
            },
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<String, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.request_body(&request, true);

        debug!(provider = "anthropic", model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(Self::classify_status(status, error_body));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(event_type) = line.strip_prefix("event: ") {
                        if event_type.trim() == "message_stop" {
                            return;
                        }
                        continue;
                    }

                    if let Some(data) = line.strip_prefix("data: ") {
                        let data = data.trim();
                        if data.is_empty() {
                            continue;
                        }

                        let event: serde_json::Value = match serde_json::from_str(data) {
                            Ok(v) => v,
                            Err(e) => {
                                trace!(error = %e, data = %data, "Ignoring unparseable Anthropic SSE");
                                continue;
                            }
                        };

                        if event["type"].as_str() == Some("content_block_delta")
                            && event["delta"]["type"].as_str() == Some("text_delta")
                        {
                            if let Some(text) = event["delta"]["text"].as_str() {
                                if tx.send(Ok(text.to_string())).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn test_connection(&self) -> std::result::Result<bool, ProviderError> {
        // Minimal 1-token request against the cheapest model
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": "claude-haiku-4-5-20251001",
            "messages": [{"role": "user", "content": "Hi"}],
            "max_tokens": 1,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        // Anthropic doesn't expose a models listing endpoint; return the catalog
        Ok(crate::catalog::known_models("anthropic")
            .into_iter()
            .map(String::from)
            .collect())
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    r#type: String,
    media_type: String,
    data: String,
}
