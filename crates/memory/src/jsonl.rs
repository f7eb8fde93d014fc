//! File-based persistence — JSON-lines transcripts and user facts.
//!
//! Each debate gets `<dir>/<debate_id>.jsonl` with one JSON-encoded
//! `Message` per line, appended in insertion order, plus a sibling
//! `<debate_id>.status` file holding the latest status string. Extracted
//! user facts live in per-user JSONL files next to them.
//!
//! Simple, portable, human-inspectable, and requires no database.

use async_trait::async_trait;
use parley_core::error::StoreError;
use parley_core::message::{DebateId, Message};
use parley_core::store::{DebateStatus, DebateStore};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// A JSONL-backed debate store.
///
/// A mutex serializes appends within the store, satisfying the
/// per-debate ordering contract.
pub struct JsonlDebateStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlDebateStore {
    /// Create a store rooted at the given directory (created on demand).
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Default directory: `~/.parley/debates`.
    pub fn default_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".parley").join("debates")
    }

    fn transcript_path(&self, debate_id: &DebateId) -> PathBuf {
        self.dir.join(format!("{debate_id}.jsonl"))
    }

    fn status_path(&self, debate_id: &DebateId) -> PathBuf {
        self.dir.join(format!("{debate_id}.status"))
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Storage(format!("Failed to create debate directory: {e}")))
    }

    /// Read back all messages for a debate, skipping corrupted lines.
    pub fn load_transcript(&self, debate_id: &DebateId) -> Vec<Message> {
        let content = match std::fs::read_to_string(self.transcript_path(debate_id)) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Read back the last persisted status, if any.
    pub fn load_status(&self, debate_id: &DebateId) -> Option<DebateStatus> {
        let content = std::fs::read_to_string(self.status_path(debate_id)).ok()?;
        serde_json::from_str(&format!("\"{}\"", content.trim())).ok()
    }
}

#[async_trait]
impl DebateStore for JsonlDebateStore {
    async fn append_message(
        &self,
        debate_id: &DebateId,
        message: &Message,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_dir()?;

        let line = serde_json::to_string(message)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.transcript_path(debate_id))
            .map_err(|e| StoreError::Storage(format!("Failed to open transcript: {e}")))?;

        writeln!(file, "{line}")
            .map_err(|e| StoreError::Storage(format!("Failed to append message: {e}")))?;

        Ok(())
    }

    async fn set_status(
        &self,
        debate_id: &DebateId,
        status: DebateStatus,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_dir()?;

        std::fs::write(self.status_path(debate_id), status.as_str())
            .map_err(|e| StoreError::Storage(format!("Failed to write status: {e}")))?;

        debug!(debate_id = %debate_id, status = %status, "Persisted debate status");
        Ok(())
    }
}

/// A JSONL-backed fact store: one file per user under `<dir>/facts`.
pub struct JsonlFactStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlFactStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    fn facts_path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}.facts.jsonl"))
    }

    fn summaries_path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}.summaries.jsonl"))
    }

    async fn append_line(
        &self,
        path: PathBuf,
        line: String,
    ) -> Result<(), parley_core::error::MemoryError> {
        use parley_core::error::MemoryError;

        let _guard = self.write_lock.lock().await;
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| MemoryError::Storage(format!("Failed to create memory directory: {e}")))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| MemoryError::Storage(format!("Failed to open fact file: {e}")))?;

        writeln!(file, "{line}")
            .map_err(|e| MemoryError::Storage(format!("Failed to append fact: {e}")))
    }
}

#[async_trait]
impl parley_core::memory::FactStore for JsonlFactStore {
    async fn save_fact(
        &self,
        fact: parley_core::memory::UserFact,
    ) -> Result<(), parley_core::error::MemoryError> {
        let line = serde_json::to_string(&fact)
            .map_err(|e| parley_core::error::MemoryError::Storage(e.to_string()))?;
        self.append_line(self.facts_path(&fact.user_id), line).await
    }

    async fn save_summary(
        &self,
        summary: parley_core::memory::DebateSummary,
    ) -> Result<(), parley_core::error::MemoryError> {
        let line = serde_json::to_string(&summary)
            .map_err(|e| parley_core::error::MemoryError::Storage(e.to_string()))?;
        self.append_line(self.summaries_path(&summary.user_id), line)
            .await
    }

    async fn facts_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<parley_core::memory::UserFact>, parley_core::error::MemoryError> {
        let content = match std::fs::read_to_string(self.facts_path(user_id)) {
            Ok(c) => c,
            Err(_) => return Ok(Vec::new()),
        };

        let mut facts: Vec<parley_core::memory::UserFact> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        facts.reverse(); // newest first
        Ok(facts)
    }
}
