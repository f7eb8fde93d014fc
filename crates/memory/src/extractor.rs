//! Memory extractor — AI-based fact extraction from completed debates.
//!
//! Runs as a detached background task after a debate completes. Uses a
//! fast, cheap model to pull user facts (name, preferences, interests)
//! and a one-sentence summary out of the transcript. Failures are logged
//! and never surface to the already-finalized debate.

use parley_core::error::MemoryError;
use parley_core::memory::{DebateSummary, FactStore, UserFact};
use parley_core::message::{DebateId, Transcript, SUMMARY_ROUND};
use parley_core::provider::GenerateRequest;
use parley_providers::catalog::FAST_MODELS;
use parley_providers::ProviderRegistry;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a memory extraction assistant. Analyze the conversation and extract:

1. User facts: Any personal information the user shared (name, preferences, interests, expertise areas)
2. Debate summary: A concise 1-sentence summary of what was discussed

Return ONLY valid JSON in this exact format (no markdown, no explanation):
{
    "facts": [
        {"type": "name", "key": "user_name", "value": "the user's name"},
        {"type": "preference", "key": "preferred_language", "value": "Spanish"},
        {"type": "interest", "key": "interest_1", "value": "photography"}
    ],
    "summary": "User asked about comparing AI models for image analysis"
}

Rules:
- Only include facts the user explicitly stated, don't infer
- If user said "I'm Michael" or "my name is Michael", extract as name fact
- For interests, use incremental keys like interest_1, interest_2
- Summary should be max 10 words
- If no facts found, return empty facts array
- Always include a summary"#;

/// The JSON payload the extraction model is asked to return.
#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    facts: Vec<RawFact>,

    #[serde(default)]
    summary: String,

    #[serde(default)]
    key_points: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawFact {
    #[serde(rename = "type", default)]
    fact_type: String,

    #[serde(default)]
    key: String,

    #[serde(default)]
    value: String,
}

/// Extract facts and a summary from a transcript and save them.
///
/// Picks the first fast model whose provider has a credential; with no
/// such provider the extraction is skipped.
pub async fn extract_and_save(
    providers: &ProviderRegistry,
    facts: &dyn FactStore,
    debate_id: &DebateId,
    user_id: &str,
    topic: &str,
    transcript: &Transcript,
) -> Result<(), MemoryError> {
    let Some((provider_id, model)) = FAST_MODELS
        .iter()
        .find(|(provider, _)| providers.has(provider))
    else {
        return Err(MemoryError::NoModelAvailable);
    };

    let provider = providers
        .get(provider_id)
        .ok_or(MemoryError::NoModelAvailable)?;

    let mut conversation = format!("USER'S QUESTION: {topic}\n\n");
    for msg in transcript.messages() {
        if msg.round == SUMMARY_ROUND {
            continue;
        }
        conversation.push_str(&format!("{}: {}\n\n", msg.speaker, msg.content));
    }

    let user_message = format!(
        "Analyze this conversation and extract memory:\n\n{conversation}\n\nReturn ONLY the JSON, no other text."
    );

    debug!(debate_id = %debate_id, provider = %provider_id, model = %model, "Running memory extraction");

    let raw = provider
        .generate(GenerateRequest::prompt(
            *model,
            user_message,
            EXTRACTION_SYSTEM_PROMPT,
        ))
        .await
        .map_err(|e| MemoryError::ExtractionFailed(e.to_string()))?;

    let payload = parse_extraction(&raw)
        .ok_or_else(|| MemoryError::ExtractionFailed("unparseable extraction output".into()))?;

    for fact in payload.facts {
        let key = fact.key.trim();
        let value = fact.value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }

        facts
            .save_fact(UserFact {
                user_id: user_id.to_string(),
                fact_type: if fact.fact_type.is_empty() {
                    "preference".into()
                } else {
                    fact.fact_type
                },
                key: key.to_string(),
                value: value.to_string(),
                source_debate_id: Some(debate_id.to_string()),
                created_at: chrono::Utc::now(),
            })
            .await?;
    }

    if !payload.summary.is_empty() {
        facts
            .save_summary(DebateSummary {
                debate_id: debate_id.to_string(),
                user_id: user_id.to_string(),
                topic_summary: payload.summary,
                key_points: payload.key_points,
                created_at: chrono::Utc::now(),
            })
            .await?;
    }

    Ok(())
}

/// Spawn extraction as a detached task.
///
/// The task is never awaited by the debate loop; failures are logged and
/// swallowed.
pub fn spawn_extraction(
    providers: Arc<ProviderRegistry>,
    facts: Arc<dyn FactStore>,
    debate_id: DebateId,
    user_id: String,
    topic: String,
    transcript: Transcript,
) {
    tokio::spawn(async move {
        if let Err(e) = extract_and_save(
            &providers,
            facts.as_ref(),
            &debate_id,
            &user_id,
            &topic,
            &transcript,
        )
        .await
        {
            warn!(debate_id = %debate_id, error = %e, "Memory extraction failed");
        }
    });
}

/// Parse the model's output into an extraction payload.
///
/// Strips markdown code fences first; if the cleaned text still fails to
/// parse, retries on the outermost `{...}` window.
fn parse_extraction(raw: &str) -> Option<ExtractionPayload> {
    let cleaned: String = if raw.trim_start().starts_with("```") {
        raw.lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        raw.to_string()
    };

    if let Ok(payload) = serde_json::from_str(cleaned.trim()) {
        return Some(payload);
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryFactStore;
    use async_trait::async_trait;
    use parley_core::error::ProviderError;
    use parley_core::message::Message;
    use parley_core::provider::Provider;

    struct FixedProvider {
        response: String,
    }

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate_stream(
            &self,
            _request: GenerateRequest,
        ) -> Result<
            tokio::sync::mpsc::Receiver<Result<String, ProviderError>>,
            ProviderError,
        > {
            let (tx, rx) = tokio::sync::mpsc::channel(1);
            let response = self.response.clone();
            tokio::spawn(async move {
                let _ = tx.send(Ok(response)).await;
            });
            Ok(rx)
        }
    }

    fn registry_with(response: &str) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(
            "google",
            Arc::new(FixedProvider {
                response: response.into(),
            }),
        );
        registry
    }

    fn sample_transcript() -> Transcript {
        let mut t = Transcript::default();
        t.push(Message::intervention(1, "I'm Michael and I love photography"));
        t.push(Message::participant(1, "Claude", "anthropic", "Nice to meet you"));
        t
    }

    #[test]
    fn parse_plain_json() {
        let payload = parse_extraction(
            r#"{"facts": [{"type": "name", "key": "user_name", "value": "Michael"}], "summary": "intro chat"}"#,
        )
        .unwrap();
        assert_eq!(payload.facts.len(), 1);
        assert_eq!(payload.summary, "intro chat");
    }

    #[test]
    fn parse_strips_code_fences() {
        let raw = "```json\n{\"facts\": [], \"summary\": \"fenced\"}\n```";
        let payload = parse_extraction(raw).unwrap();
        assert_eq!(payload.summary, "fenced");
    }

    #[test]
    fn parse_falls_back_to_brace_window() {
        let raw = "Here is the result: {\"facts\": [], \"summary\": \"embedded\"} hope that helps!";
        let payload = parse_extraction(raw).unwrap();
        assert_eq!(payload.summary, "embedded");
    }

    #[test]
    fn parse_garbage_returns_none() {
        assert!(parse_extraction("no json here").is_none());
    }

    #[tokio::test]
    async fn extraction_saves_facts_and_summary() {
        let registry = registry_with(
            r#"{"facts": [{"type": "name", "key": "user_name", "value": "Michael"}], "summary": "User introduced themselves"}"#,
        );
        let store = InMemoryFactStore::new();

        extract_and_save(
            &registry,
            &store,
            &DebateId::from("d1"),
            "u1",
            "introductions",
            &sample_transcript(),
        )
        .await
        .unwrap();

        let facts = store.facts_for("u1").await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, "Michael");
        assert_eq!(facts[0].source_debate_id.as_deref(), Some("d1"));

        let summaries = store.summaries().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].topic_summary, "User introduced themselves");
    }

    #[tokio::test]
    async fn extraction_skips_blank_facts() {
        let registry = registry_with(
            r#"{"facts": [{"type": "name", "key": "", "value": "x"}, {"type": "", "key": "k", "value": ""}], "summary": "s"}"#,
        );
        let store = InMemoryFactStore::new();

        extract_and_save(
            &registry,
            &store,
            &DebateId::from("d1"),
            "u1",
            "t",
            &sample_transcript(),
        )
        .await
        .unwrap();

        assert_eq!(store.fact_count().await, 0);
    }

    #[tokio::test]
    async fn extraction_without_provider_fails_closed() {
        let registry = ProviderRegistry::new();
        let store = InMemoryFactStore::new();

        let result = extract_and_save(
            &registry,
            &store,
            &DebateId::from("d1"),
            "u1",
            "t",
            &sample_transcript(),
        )
        .await;

        assert!(matches!(result, Err(MemoryError::NoModelAvailable)));
    }
}
