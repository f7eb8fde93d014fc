//! # Parley Engine
//!
//! The debate orchestration engine: a stateful control loop that drives
//! rounds of streamed participant responses, builds each participant's
//! evolving context, detects convergence, splices in live user
//! interventions, and triggers the final synthesis plus best-effort
//! memory extraction.
//!
//! A single debate is strictly sequential within a round — each
//! participant's context depends on all prior output — while the hosting
//! process may run many debates concurrently, one task per debate.

pub mod agreement;
pub mod context;
pub mod intervention;
pub mod orchestrator;

pub use agreement::{AgreementChecker, ConsensusRule, KeywordConsensus};
pub use context::ContextBuilder;
pub use intervention::{intervention_channel, InterventionQueue, InterventionSender};
pub use orchestrator::{DebateHandle, DebateOrchestrator};
