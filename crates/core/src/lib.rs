//! # Parley Core
//!
//! Domain types, traits, and error definitions for the Parley debate
//! orchestration runtime. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability (LLM backend, persistence, fact memory) is
//! defined as a trait here. Implementations live in their respective crates.
//! This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod participant;
pub mod policy;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, StoreError};
pub use event::{DebateEvent, EventBus};
pub use memory::{DebateSummary, FactStore, UserFact};
pub use message::{DebateId, Message, Transcript, SUMMARY_ROUND, USER_SPEAKER};
pub use participant::Participant;
pub use policy::TerminationPolicy;
pub use provider::{ChatMessage, ChatRole, GenerateRequest, ImageAttachment, Provider};
pub use store::{DebateStatus, DebateStore};
