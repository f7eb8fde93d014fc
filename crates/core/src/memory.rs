//! User memory traits — facts extracted from completed debates.
//!
//! After a debate completes, a background task extracts user facts and a
//! one-sentence summary from the transcript. Facts feed back into future
//! debates as a short context note.

use crate::error::MemoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single fact the user stated about themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFact {
    /// The user this fact belongs to
    pub user_id: String,

    /// Fact category: "name", "preference", "interest", ...
    pub fact_type: String,

    /// Stable key, e.g. "user_name", "profession", "interest_1"
    pub key: String,

    /// The fact value
    pub value: String,

    /// Debate the fact was extracted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_debate_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A one-sentence record of what a debate was about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSummary {
    pub debate_id: String,
    pub user_id: String,

    /// Max ~10 words
    pub topic_summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,

    pub created_at: DateTime<Utc>,
}

/// Storage for extracted user facts and debate summaries.
#[async_trait]
pub trait FactStore: Send + Sync {
    async fn save_fact(&self, fact: UserFact) -> std::result::Result<(), MemoryError>;

    async fn save_summary(
        &self,
        summary: DebateSummary,
    ) -> std::result::Result<(), MemoryError>;

    /// All stored facts for a user, newest first.
    async fn facts_for(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<UserFact>, MemoryError>;
}

/// Build the short memory note injected into round-1 context.
///
/// Only core identifying facts (name, profession) are included — recent
/// topics would anchor the discussion. Returns an empty string when no
/// such facts exist.
pub fn context_note(facts: &[UserFact]) -> String {
    let mut lines = Vec::new();

    for fact in facts {
        match fact.key.as_str() {
            "user_name" => lines.push(format!("Name: {}", fact.value)),
            "profession" => lines.push(format!("Profession: {}", fact.value)),
            _ => {}
        }
    }

    lines.join("\n")
}
