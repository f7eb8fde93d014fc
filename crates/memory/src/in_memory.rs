//! In-memory backends — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use parley_core::error::{MemoryError, StoreError};
use parley_core::memory::{DebateSummary, FactStore, UserFact};
use parley_core::message::{DebateId, Message};
use parley_core::store::{DebateStatus, DebateStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory debate store keeping messages and statuses in maps.
///
/// Appends within a debate are serialized by the write lock, matching the
/// ordering contract of `DebateStore`.
#[derive(Default)]
pub struct InMemoryDebateStore {
    messages: Arc<RwLock<HashMap<String, Vec<Message>>>>,
    statuses: Arc<RwLock<HashMap<String, DebateStatus>>>,
}

impl InMemoryDebateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages stored for a debate, in append order.
    pub async fn messages_for(&self, debate_id: &DebateId) -> Vec<Message> {
        self.messages
            .read()
            .await
            .get(&debate_id.0)
            .cloned()
            .unwrap_or_default()
    }

    /// The last status written for a debate.
    pub async fn status_of(&self, debate_id: &DebateId) -> Option<DebateStatus> {
        self.statuses.read().await.get(&debate_id.0).copied()
    }
}

#[async_trait]
impl DebateStore for InMemoryDebateStore {
    async fn append_message(
        &self,
        debate_id: &DebateId,
        message: &Message,
    ) -> Result<(), StoreError> {
        self.messages
            .write()
            .await
            .entry(debate_id.0.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn set_status(
        &self,
        debate_id: &DebateId,
        status: DebateStatus,
    ) -> Result<(), StoreError> {
        self.statuses
            .write()
            .await
            .insert(debate_id.0.clone(), status);
        Ok(())
    }
}

/// An in-memory fact store.
#[derive(Default)]
pub struct InMemoryFactStore {
    facts: Arc<RwLock<Vec<UserFact>>>,
    summaries: Arc<RwLock<Vec<DebateSummary>>>,
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn summaries(&self) -> Vec<DebateSummary> {
        self.summaries.read().await.clone()
    }

    pub async fn fact_count(&self) -> usize {
        self.facts.read().await.len()
    }
}

#[async_trait]
impl FactStore for InMemoryFactStore {
    async fn save_fact(&self, fact: UserFact) -> Result<(), MemoryError> {
        self.facts.write().await.push(fact);
        Ok(())
    }

    async fn save_summary(&self, summary: DebateSummary) -> Result<(), MemoryError> {
        self.summaries.write().await.push(summary);
        Ok(())
    }

    async fn facts_for(&self, user_id: &str) -> Result<Vec<UserFact>, MemoryError> {
        let facts = self.facts.read().await;
        let mut matched: Vec<UserFact> = facts
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        matched.reverse(); // newest first
        Ok(matched)
    }
}
