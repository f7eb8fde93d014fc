//! Debate event stream — the structured events observers consume.
//!
//! Events are published to a broadcast bus as they happen; delivery is
//! best-effort to zero or more listeners and never affects the debate
//! itself. Field names are stable — UI and transport layers key off them.

use crate::store::DebateStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All events emitted over the lifetime of a debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// A new round is starting.
    RoundStart { round: u32, total_rounds: u32 },

    /// A round finished (all participants had their turn).
    RoundEnd { round: u32 },

    /// A participant's turn is starting.
    ModelStart {
        model_name: String,
        provider: String,
        round: u32,
    },

    /// A participant's turn completed and was persisted.
    ModelEnd {
        model_name: String,
        provider: String,
        round: u32,
    },

    /// One streamed text fragment from a participant.
    Chunk {
        model_name: String,
        provider: String,
        content: String,
        round: u32,
    },

    /// A participant's turn failed (missing credential or call failure).
    /// Non-fatal — the round continues with the next participant.
    ModelError {
        model_name: String,
        provider: String,
        error: String,
    },

    /// A user intervention was enqueued.
    InterventionReceived { content: String },

    /// A queued intervention was spliced into the transcript.
    UserIntervention { round: u32, content: String },

    /// The agreement check returned a positive verdict after `round`.
    AgreementReached { round: u32 },

    /// The summarizer started streaming the final synthesis.
    SummaryStart { model_name: String },

    /// One streamed text fragment of the summary.
    SummaryChunk { model_name: String, content: String },

    /// The summary completed and was persisted under round 0.
    SummaryEnd { model_name: String },

    /// The summary failed — reported, debate status unchanged.
    SummaryError { error: String },

    /// The debate reached a terminal state.
    DebateEnd { status: DebateStatus },

    /// An unhandled orchestrator-level failure — the debate is now `error`.
    Error { message: String },
}

impl DebateEvent {
    /// Wire-level event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RoundStart { .. } => "round_start",
            Self::RoundEnd { .. } => "round_end",
            Self::ModelStart { .. } => "model_start",
            Self::ModelEnd { .. } => "model_end",
            Self::Chunk { .. } => "chunk",
            Self::ModelError { .. } => "model_error",
            Self::InterventionReceived { .. } => "intervention_received",
            Self::UserIntervention { .. } => "user_intervention",
            Self::AgreementReached { .. } => "agreement_reached",
            Self::SummaryStart { .. } => "summary_start",
            Self::SummaryChunk { .. } => "summary_chunk",
            Self::SummaryEnd { .. } => "summary_end",
            Self::SummaryError { .. } => "summary_error",
            Self::DebateEnd { .. } => "debate_end",
            Self::Error { .. } => "error",
        }
    }
}

/// A broadcast-based bus for debate events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Publishing
/// with no subscribers is fine; delivery failure never aborts a debate.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DebateEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DebateEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DebateEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
