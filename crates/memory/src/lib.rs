//! Persistence backends and user-memory extraction for Parley.
//!
//! Implements `parley_core::DebateStore` (in-memory, JSONL files) and
//! `parley_core::FactStore` (in-memory), plus the background fact
//! extractor that runs after a debate completes.

pub mod extractor;
pub mod in_memory;
pub mod jsonl;

pub use extractor::{extract_and_save, spawn_extraction};
pub use in_memory::{InMemoryDebateStore, InMemoryFactStore};
pub use jsonl::{JsonlDebateStore, JsonlFactStore};
