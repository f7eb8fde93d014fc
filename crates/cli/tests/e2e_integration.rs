//! End-to-end integration tests for the Parley debate runtime.
//!
//! These tests exercise the full pipeline from configuration to persisted
//! transcript: registry construction, the orchestrator round loop, event
//! streaming, interventions, agreement-seeking termination, and the
//! user-memory feedback loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use parley_core::error::ProviderError;
use parley_core::event::{DebateEvent, EventBus};
use parley_core::memory::{context_note, FactStore};
use parley_core::message::DebateId;
use parley_core::participant::Participant;
use parley_core::policy::TerminationPolicy;
use parley_core::provider::{GenerateRequest, Provider};
use parley_core::store::DebateStatus;
use parley_engine::DebateOrchestrator;
use parley_memory::{JsonlDebateStore, JsonlFactStore};
use parley_providers::ProviderRegistry;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that streams scripted responses in sequence, chunked
/// word-by-word the way a real backend trickles tokens.
struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<String, ProviderError>>, ProviderError>
    {
        self.requests.lock().unwrap().push(request);

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider exhausted"));

        let (tx, rx) = tokio::sync::mpsc::channel(16);
        tokio::spawn(async move {
            let mut rest = response.as_str();
            while !rest.is_empty() {
                let split = rest
                    .char_indices()
                    .find(|(i, c)| *i > 0 && *c == ' ')
                    .map(|(i, _)| i + 1)
                    .unwrap_or(rest.len());
                let (chunk, tail) = rest.split_at(split);
                if tx.send(Ok(chunk.to_string())).await.is_err() {
                    return;
                }
                rest = tail;
            }
        });
        Ok(rx)
    }
}

fn registry_of(entries: Vec<(&str, Arc<dyn Provider>)>) -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    for (name, provider) in entries {
        registry.register(name, provider);
    }
    Arc::new(registry)
}

// ── E2E: Fixed rounds, JSONL persistence ─────────────────────────────────

#[tokio::test]
async fn e2e_fixed_round_debate_persists_ordered_transcript() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        "Tea has more subtle flavors.",
        "Coffee fuels the world economy.",
        "I concede coffee is more popular, but tea is healthier.",
        "Popularity matters; still, tea has its place.",
        "Both sides found middle ground on taste versus reach.",
    ]));
    let registry = registry_of(vec![("e2e", provider.clone())]);

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlDebateStore::new(dir.path().to_path_buf()));
    let events = Arc::new(EventBus::new(1024));

    let orchestrator = DebateOrchestrator::new(
        "Is tea better than coffee?",
        vec![
            Participant::new("e2e", "model-a", "TeaBot"),
            Participant::new("e2e", "model-b", "CoffeeBot"),
        ],
        TerminationPolicy::fixed(2),
        registry,
        store.clone(),
        events.clone(),
    )
    .with_debate_id(DebateId::from("e2e-fixed"));

    let mut rx = events.subscribe();
    let status = orchestrator.run().await;
    assert_eq!(status, DebateStatus::Completed);

    // The JSONL transcript reflects insertion order: R×N + round-0 summary
    let debate_id = DebateId::from("e2e-fixed");
    let messages = store.load_transcript(&debate_id);
    let keys: Vec<(u32, &str)> = messages
        .iter()
        .map(|m| (m.round, m.speaker.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (1, "TeaBot"),
            (1, "CoffeeBot"),
            (2, "TeaBot"),
            (2, "CoffeeBot"),
            (0, "TeaBot"),
        ]
    );
    assert_eq!(messages[0].content, "Tea has more subtle flavors.");
    assert_eq!(store.load_status(&debate_id), Some(DebateStatus::Completed));

    // Chunks reassemble exactly into the persisted content
    let mut streamed = String::new();
    let mut saw_summary_chunks = false;
    while let Ok(event) = rx.try_recv() {
        match event.as_ref() {
            DebateEvent::Chunk { content, round: 1, model_name, .. }
                if model_name == "TeaBot" =>
            {
                streamed.push_str(content);
            }
            DebateEvent::SummaryChunk { .. } => saw_summary_chunks = true,
            _ => {}
        }
    }
    assert_eq!(streamed, "Tea has more subtle flavors.");
    assert!(saw_summary_chunks);
}

// ── E2E: Agreement-seeking with an intervention ──────────────────────────

#[tokio::test]
async fn e2e_agreement_debate_with_early_intervention() {
    let debater = Arc::new(ScriptedProvider::new(vec![
        "Opening position one.",
        "Opening position two.",
        "Refined position one.",
        "Refined position two.",
        "Final synthesis.",
    ]));
    let checker = Arc::new(ScriptedProvider::new(vec!["AGREE"]));
    let registry = registry_of(vec![
        ("e2e", debater.clone()),
        ("google", checker.clone()),
    ]);

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlDebateStore::new(dir.path().to_path_buf()));
    let events = Arc::new(EventBus::new(1024));

    let orchestrator = DebateOrchestrator::new(
        "How should we cache results?",
        vec![
            Participant::new("e2e", "model-a", "Planner"),
            Participant::new("e2e", "model-b", "Reviewer"),
        ],
        TerminationPolicy::until_agreement(10),
        registry,
        store.clone(),
        events.clone(),
    )
    .with_debate_id(DebateId::from("e2e-agree"));

    // Intervene before the debate starts: visible to every opening turn
    orchestrator.handle().intervene("please keep it under 100 words");

    let mut rx = events.subscribe();
    let status = orchestrator.run().await;
    assert_eq!(status, DebateStatus::Completed);

    // Agreement on the first eligible check (after round 2)
    let mut reached_at = None;
    while let Ok(event) = rx.try_recv() {
        if let DebateEvent::AgreementReached { round } = event.as_ref() {
            reached_at = Some(*round);
        }
    }
    assert_eq!(reached_at, Some(2));

    // The intervention is persisted as a "User" message ahead of round 1
    let messages = store.load_transcript(&DebateId::from("e2e-agree"));
    assert!(messages[0].is_intervention());
    assert_eq!(messages[0].content, "please keep it under 100 words");

    // ... and the first participant saw it in its opening context
    let requests = debater.requests.lock().unwrap();
    assert!(requests[0].messages[0]
        .content
        .contains("please keep it under 100 words"));
    // 2 rounds × 2 participants + summary
    assert_eq!(requests.len(), 5);
}

// ── E2E: Config file → registry wiring ───────────────────────────────────

#[tokio::test]
async fn e2e_config_file_drives_registry() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[providers.anthropic]
api_key = "sk-ant-e2e"

[providers.deepseek]
api_key = "sk-ds-e2e"

[providers.xai]
api_key = ""
"#
    )
    .unwrap();

    let config = parley_config::AppConfig::load_from(file.path()).unwrap();
    let registry = parley_providers::registry::build_from_config(&config);

    assert!(registry.has("anthropic"));
    assert!(registry.has("deepseek"));
    assert!(!registry.has("xai")); // empty key is not a credential
}

// ── E2E: Memory loop across two debates ──────────────────────────────────

#[tokio::test]
async fn e2e_extracted_facts_feed_the_next_debate() {
    let debater = Arc::new(ScriptedProvider::new(vec![
        "Nice to meet you, Michael.",
        "A good first chat.",
        "Hobbies keep the mind sharp.",
        "Another good chat.",
    ]));
    let extractor = Arc::new(ScriptedProvider::new(vec![
        r#"{"facts": [{"type": "name", "key": "user_name", "value": "Michael"}], "summary": "Introductions"}"#,
    ]));
    let registry = registry_of(vec![
        ("e2e", debater.clone()),
        ("google", extractor.clone()),
    ]);

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlDebateStore::new(dir.path().join("debates")));
    let facts: Arc<JsonlFactStore> =
        Arc::new(JsonlFactStore::new(dir.path().join("memory")));

    // First debate: user introduces themselves; extraction runs detached
    let orchestrator = DebateOrchestrator::new(
        "introductions",
        vec![Participant::new("e2e", "model-a", "Host")],
        TerminationPolicy::fixed(1),
        registry.clone(),
        store.clone(),
        Arc::new(EventBus::new(256)),
    )
    .with_user_memory("u1", facts.clone());
    orchestrator.handle().intervene("Hi, I'm Michael");

    let status = orchestrator.run().await;
    assert_eq!(status, DebateStatus::Completed);

    // Wait for the detached extraction to land
    let mut saved = Vec::new();
    for _ in 0..100 {
        saved = facts.facts_for("u1").await.unwrap();
        if !saved.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].value, "Michael");

    // Second debate: the memory note reaches round-1 context
    let note = context_note(&saved);
    assert_eq!(note, "Name: Michael");

    let orchestrator = DebateOrchestrator::new(
        "favorite hobbies",
        vec![Participant::new("e2e", "model-a", "Host")],
        TerminationPolicy::fixed(1),
        registry,
        store,
        Arc::new(EventBus::new(256)),
    )
    .with_memory_note(note);

    let status = orchestrator.run().await;
    assert_eq!(status, DebateStatus::Completed);

    let requests = debater.requests.lock().unwrap();
    let second_debate_opening = &requests[2].messages[0].content;
    assert!(second_debate_opening.contains("WHAT YOU KNOW ABOUT THE USER"));
    assert!(second_debate_opening.contains("Name: Michael"));
}
