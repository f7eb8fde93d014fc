//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, Deepseek, xAI, Google's Gemini OpenAI-compatible
//! endpoint, and any other `/chat/completions` backend.
//!
//! Supports:
//! - Streaming SSE chat completions
//! - Image attachments as `image_url` data-URI content parts
//! - Model listing and connection checks

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::error::ProviderError;
use parley_core::provider::{ChatMessage, ChatRole, GenerateRequest, ImageAttachment, Provider};
use serde::Serialize;
use tracing::{debug, trace, warn};

/// An OpenAI-compatible LLM provider.
///
/// This handles most hosted backends since nearly every vendor exposes an
/// OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Convert our messages to OpenAI API format.
    ///
    /// The system prompt is prepended as a system message; image
    /// attachments become data-URI `image_url` parts on the first user
    /// message.
    fn to_api_messages(
        system_prompt: Option<&str>,
        messages: &[ChatMessage],
        images: &[ImageAttachment],
    ) -> Vec<ApiMessage> {
        let mut result = Vec::new();

        if let Some(sys) = system_prompt {
            if !sys.is_empty() {
                result.push(ApiMessage {
                    role: "system".into(),
                    content: ApiContent::Text(sys.into()),
                });
            }
        }

        let mut images_pending = !images.is_empty();
        for msg in messages {
            let role = match msg.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };

            let content = if role == "user" && images_pending {
                images_pending = false;
                let mut parts = vec![ApiContentPart::Text {
                    text: msg.content.clone(),
                }];
                parts.extend(images.iter().map(|img| ApiContentPart::ImageUrl {
                    image_url: ApiImageUrl {
                        url: format!("data:{};base64,{}", img.media_type, img.base64),
                    },
                }));
                ApiContent::Parts(parts)
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

    fn classify_status(status: u16, error_body: String) -> ProviderError {
        match status {
            429 => ProviderError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => ProviderError::ApiError {
                status_code: status,
                message: error_body,
            },
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
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
        let url = format!("{}/chat/completions", self.base_url);
        let api_messages = Self::to_api_messages(
            request.system_prompt.as_deref(),
            &request.messages,
            &request.images,
        );

        let body = serde_json::json!({
            "model": request.model,
            "messages": api_messages,
            "stream": true,
        });

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
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

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let data = data.trim();

                    if data == "[DONE]" {
                        return;
                    }
                    if data.is_empty() {
                        continue;
                    }

                    let event: serde_json::Value = match serde_json::from_str(data) {
                        Ok(v) => v,
                        Err(e) => {
                            trace!(error = %e, data = %data, "Ignoring unparseable SSE line");
                            continue;
                        }
                    };

                    if let Some(delta) = event["choices"][0]["delta"]["content"].as_str() {
                        if !delta.is_empty() && tx.send(Ok(delta.to_string())).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn test_connection(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Parts(Vec<ApiContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ApiContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ApiImageUrl },
}

#[derive(Debug, Serialize)]
struct ApiImageUrl {
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let provider = OpenAiCompatProvider::new("deepseek", "https://api.deepseek.com/v1/", "k");
        assert_eq!(provider.base_url, "https://api.deepseek.com/v1");
        assert_eq!(provider.name(), "deepseek");
    }

    #[test]
    fn system_prompt_prepended() {
        let api_msgs = OpenAiCompatProvider::to_api_messages(
            Some("be brief"),
            &[ChatMessage::user("Hello")],
            &[],
        );
        assert_eq!(api_msgs.len(), 2);
        assert_eq!(api_msgs[0].role, "system");
        assert_eq!(api_msgs[1].role, "user");
    }

    #[test]
    fn empty_system_prompt_omitted() {
        let api_msgs =
            OpenAiCompatProvider::to_api_messages(Some(""), &[ChatMessage::user("Hello")], &[]);
        assert_eq!(api_msgs.len(), 1);
    }

    #[test]
    fn images_become_data_uri_parts() {
        let images = vec![ImageAttachment {
            base64: "aGk=".into(),
            media_type: "image/png".into(),
        }];
        let api_msgs = OpenAiCompatProvider::to_api_messages(
            None,
            &[ChatMessage::user("What is this?")],
            &images,
        );

        match &api_msgs[0].content {
            ApiContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                match &parts[1] {
                    ApiContentPart::ImageUrl { image_url } => {
                        assert_eq!(image_url.url, "data:image/png;base64,aGk=");
                    }
                    _ => panic!("Expected image_url part"),
                }
            }
            _ => panic!("Expected parts content"),
        }
    }

    #[test]
    fn content_part_serialization() {
        let part = ApiContentPart::ImageUrl {
            image_url: ApiImageUrl {
                url: "data:image/png;base64,xyz".into(),
            },
        };
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains(r#""type":"image_url""#));
        assert!(json.contains("base64,xyz"));
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            OpenAiCompatProvider::classify_status(429, String::new()),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            OpenAiCompatProvider::classify_status(403, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
    }
}
