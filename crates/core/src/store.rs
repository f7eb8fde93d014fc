//! Persistence traits — message appends and debate status transitions.
//!
//! The relational schema behind these operations is an external concern;
//! Parley only requires that per-message appends are serialized within a
//! debate. No coordination across debates is needed.

use crate::error::StoreError;
use crate::message::{DebateId, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Debate lifecycle status. Transitions are monotonic:
/// `pending → running → {completed | stopped | error}`.
/// Terminal states never reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebateStatus {
    Pending,
    Running,
    Completed,
    Stopped,
    Error,
}

impl DebateStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for DebateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persistence capability consumed by the orchestrator.
///
/// Implementations: in-memory (testing), JSONL files. Backends must
/// serialize appends within a debate so the stored insertion order matches
/// the transcript.
#[async_trait]
pub trait DebateStore: Send + Sync {
    /// Append one message record for the given debate.
    async fn append_message(
        &self,
        debate_id: &DebateId,
        message: &Message,
    ) -> std::result::Result<(), StoreError>;

    /// Update the debate's status.
    async fn set_status(
        &self,
        debate_id: &DebateId,
        status: DebateStatus,
    ) -> std::result::Result<(), StoreError>;
}
