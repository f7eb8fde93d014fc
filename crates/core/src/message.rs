//! Message and Transcript domain types.
//!
//! These are the core value objects that flow through a debate:
//! each participant turn produces a `Message`, the ordered collection
//! forms the `Transcript` that later turns build their context from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The sentinel round number under which the final summary is persisted.
pub const SUMMARY_ROUND: u32 = 0;

/// The speaker name attributed to user interventions.
pub const USER_SPEAKER: &str = "User";

/// Unique identifier for a debate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DebateId(pub String);

impl DebateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for DebateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DebateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single message in a debate transcript.
///
/// Ordering key is `(round, insertion sequence)` — the transcript is
/// append-only, so `Vec` order within a round is the insertion sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Debate round — `0` is the summary sentinel, `1..N` are debate rounds
    pub round: u32,

    /// Display name of the speaker ("User" for interventions)
    pub speaker: String,

    /// Provider id the speaker belongs to ("user" for interventions)
    pub provider: String,

    /// The text content
    pub content: String,

    /// Timestamp
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message produced by a participant in a debate round.
    pub fn participant(
        round: u32,
        speaker: impl Into<String>,
        provider: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            round,
            speaker: speaker.into(),
            provider: provider.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a user intervention message, spliced in during `round`.
    pub fn intervention(round: u32, content: impl Into<String>) -> Self {
        Self {
            round,
            speaker: USER_SPEAKER.into(),
            provider: "user".into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a summary message, persisted under the round-0 sentinel.
    pub fn summary(
        speaker: impl Into<String>,
        provider: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            round: SUMMARY_ROUND,
            speaker: speaker.into(),
            provider: provider.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether this message is a user intervention.
    pub fn is_intervention(&self) -> bool {
        self.speaker == USER_SPEAKER
    }
}

/// The in-memory, append-only record of a debate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Insertion order is the ordering key within a round.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Debate-round messages only (excludes the round-0 summary).
    pub fn debate_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.round > SUMMARY_ROUND)
    }

    /// Count of debate-round messages produced by the given speaker.
    pub fn count_for_speaker(&self, speaker: &str) -> usize {
        self.debate_messages()
            .filter(|m| m.speaker == speaker)
            .count()
    }

    /// The most recent debate-round message per distinct non-user speaker,
    /// in first-appearance order. Latest message wins per speaker.
    pub fn latest_per_speaker(&self) -> Vec<(String, String)> {
        let mut order: Vec<String> = Vec::new();
        let mut latest: std::collections::HashMap<String, String> =
            std::collections::HashMap::new();

        for msg in self.debate_messages() {
            if msg.is_intervention() {
                continue;
            }
            if !latest.contains_key(&msg.speaker) {
                order.push(msg.speaker.clone());
            }
            latest.insert(msg.speaker.clone(), msg.content.clone());
        }

        order
            .into_iter()
            .map(|speaker| {
                let content = latest.remove(&speaker).unwrap_or_default();
                (speaker, content)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_message_fields() {
        let msg = Message::participant(2, "Claude", "anthropic", "I think...");
        assert_eq!(msg.round, 2);
        assert_eq!(msg.speaker, "Claude");
        assert!(!msg.is_intervention());
    }

    #[test]
    fn intervention_is_attributed_to_user() {
        let msg = Message::intervention(1, "What about costs?");
        assert_eq!(msg.speaker, USER_SPEAKER);
        assert!(msg.is_intervention());
    }

    #[test]
    fn summary_uses_sentinel_round() {
        let msg = Message::summary("GPT-4o", "openai", "In summary...");
        assert_eq!(msg.round, SUMMARY_ROUND);
    }

    #[test]
    fn latest_per_speaker_dedups_latest_wins() {
        let mut t = Transcript::new();
        t.push(Message::participant(1, "A", "p1", "a round 1"));
        t.push(Message::participant(1, "B", "p2", "b round 1"));
        t.push(Message::intervention(2, "user says hi"));
        t.push(Message::participant(2, "A", "p1", "a round 2"));

        let latest = t.latest_per_speaker();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0], ("A".to_string(), "a round 2".to_string()));
        assert_eq!(latest[1], ("B".to_string(), "b round 1".to_string()));
    }

    #[test]
    fn latest_per_speaker_skips_summary() {
        let mut t = Transcript::new();
        t.push(Message::participant(1, "A", "p1", "position"));
        t.push(Message::summary("A", "p1", "the summary"));

        let latest = t.latest_per_speaker();
        assert_eq!(latest, vec![("A".to_string(), "position".to_string())]);
    }

    #[test]
    fn count_for_speaker_ignores_summary() {
        let mut t = Transcript::new();
        t.push(Message::participant(1, "A", "p1", "one"));
        t.push(Message::participant(2, "A", "p1", "two"));
        t.push(Message::summary("A", "p1", "sum"));
        assert_eq!(t.count_for_speaker("A"), 2);
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::participant(1, "Claude", "anthropic", "Hello");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content, "Hello");
        assert_eq!(back.round, 1);
    }
}
