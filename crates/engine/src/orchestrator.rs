//! The debate orchestrator — runs a full debate to a terminal state.
//!
//! State machine: `pending → running → {completed | stopped | error}`,
//! one-way. `stop()` is cooperative: the flag is observed at round
//! boundaries, before each participant's turn, and inside the chunk
//! loop; an in-flight provider call is never forcibly aborted.
//!
//! Per-participant failures (missing credential, call failure) are
//! reported as `model_error` events and never abort the round. The only
//! path to `error` is an unhandled orchestrator-level failure.

use crate::agreement::AgreementChecker;
use crate::context::{self, ContextBuilder};
use crate::intervention::{intervention_channel, InterventionQueue, InterventionSender};
use parley_core::error::{Error, ProviderError};
use parley_core::event::{DebateEvent, EventBus};
use parley_core::memory::FactStore;
use parley_core::message::{DebateId, Message, Transcript};
use parley_core::participant::{vision_first, Participant};
use parley_core::policy::TerminationPolicy;
use parley_core::provider::{GenerateRequest, ImageAttachment, Provider};
use parley_core::store::{DebateStatus, DebateStore};
use parley_providers::ProviderRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A cloneable handle for interacting with a running debate.
#[derive(Clone)]
pub struct DebateHandle {
    stopped: Arc<AtomicBool>,
    interventions: InterventionSender,
    events: Arc<EventBus>,
}

impl DebateHandle {
    /// Request a cooperative stop. Observed at the next checkpoint.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Enqueue a user intervention. It becomes visible to the next
    /// participant's turn, never mid-stream.
    pub fn intervene(&self, text: impl Into<String>) {
        let text = text.into();
        if self.interventions.submit(text.clone()) {
            self.events
                .publish(DebateEvent::InterventionReceived { content: text });
        }
    }
}

/// Drives one debate from construction to a terminal state.
pub struct DebateOrchestrator {
    debate_id: DebateId,
    topic: String,
    participants: Vec<Participant>,
    policy: TerminationPolicy,
    summarizer_index: usize,
    providers: Arc<ProviderRegistry>,
    store: Arc<dyn DebateStore>,
    events: Arc<EventBus>,
    agreement: AgreementChecker,
    images: Vec<ImageAttachment>,
    background: Option<String>,
    memory_note: Option<String>,
    user_id: Option<String>,
    facts: Option<Arc<dyn FactStore>>,
    stopped: Arc<AtomicBool>,
    intervention_tx: InterventionSender,
    interventions: InterventionQueue,
    transcript: Transcript,
}

impl DebateOrchestrator {
    pub fn new(
        topic: impl Into<String>,
        participants: Vec<Participant>,
        policy: TerminationPolicy,
        providers: Arc<ProviderRegistry>,
        store: Arc<dyn DebateStore>,
        events: Arc<EventBus>,
    ) -> Self {
        let (intervention_tx, interventions) = intervention_channel();
        Self {
            debate_id: DebateId::new(),
            topic: topic.into(),
            participants,
            policy,
            summarizer_index: 0,
            agreement: AgreementChecker::new(providers.clone()),
            providers,
            store,
            events,
            images: Vec::new(),
            background: None,
            memory_note: None,
            user_id: None,
            facts: None,
            stopped: Arc::new(AtomicBool::new(false)),
            intervention_tx,
            interventions,
            transcript: Transcript::new(),
        }
    }

    /// Use an existing debate id instead of a generated one.
    pub fn with_debate_id(mut self, debate_id: DebateId) -> Self {
        self.debate_id = debate_id;
        self
    }

    /// Designate the summarizer by index into the *configured* participant
    /// order (vision reordering does not shift it).
    pub fn with_summarizer(mut self, index: usize) -> Self {
        self.summarizer_index = index;
        self
    }

    /// Attach images. Offered only in round 1, only to vision-capable
    /// participants; triggers vision-first speaking order.
    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    /// Transcript text from a previous continued conversation.
    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    /// Short persistent note about the user, injected into round 1.
    pub fn with_memory_note(mut self, note: impl Into<String>) -> Self {
        self.memory_note = Some(note.into());
        self
    }

    /// Attach a user identity and fact store; enables the detached
    /// memory-extraction task on clean completion.
    pub fn with_user_memory(
        mut self,
        user_id: impl Into<String>,
        facts: Arc<dyn FactStore>,
    ) -> Self {
        self.user_id = Some(user_id.into());
        self.facts = Some(facts);
        self
    }

    /// Replace the default agreement checker.
    pub fn with_agreement_checker(mut self, checker: AgreementChecker) -> Self {
        self.agreement = checker;
        self
    }

    pub fn debate_id(&self) -> &DebateId {
        &self.debate_id
    }

    /// A handle for stop/intervene, usable from other tasks.
    pub fn handle(&self) -> DebateHandle {
        DebateHandle {
            stopped: self.stopped.clone(),
            interventions: self.intervention_tx.clone(),
            events: self.events.clone(),
        }
    }

    /// Run the debate to a terminal state.
    ///
    /// Every outcome is reflected in persisted status and a terminal
    /// `debate_end` event; the returned status matches both.
    pub async fn run(mut self) -> DebateStatus {
        info!(
            debate_id = %self.debate_id,
            topic = %self.topic,
            participants = self.participants.len(),
            "Starting debate"
        );

        match self.drive().await {
            Ok(status) => status,
            Err(e) => {
                error!(debate_id = %self.debate_id, error = %e, "Debate failed");
                self.events.publish(DebateEvent::Error {
                    message: e.to_string(),
                });
                if let Err(persist_err) = self
                    .store
                    .set_status(&self.debate_id, DebateStatus::Error)
                    .await
                {
                    warn!(error = %persist_err, "Failed to persist error status");
                }
                self.events.publish(DebateEvent::DebateEnd {
                    status: DebateStatus::Error,
                });
                DebateStatus::Error
            }
        }
    }

    async fn drive(&mut self) -> Result<DebateStatus, Error> {
        self.store
            .set_status(&self.debate_id, DebateStatus::Running)
            .await?;

        // Speaking order is fixed once: vision-capable first when images
        // are attached, so an early participant can actually see them.
        let order = if self.images.is_empty() {
            self.participants.clone()
        } else {
            vision_first(&self.participants)
        };

        let policy = self.policy.clone();
        let first_round = policy.first_round();
        let final_round = policy.final_round();

        match policy {
            TerminationPolicy::FixedRounds { rounds, .. } => {
                for round in first_round..first_round + rounds {
                    if self.is_stopped() {
                        break;
                    }
                    self.events.publish(DebateEvent::RoundStart {
                        round,
                        total_rounds: final_round,
                    });
                    self.run_round(round, &order, Some(final_round)).await?;
                    self.events.publish(DebateEvent::RoundEnd { round });
                }
            }
            TerminationPolicy::UntilAgreement { max_rounds } => {
                for round in 1..=max_rounds {
                    if self.is_stopped() {
                        break;
                    }
                    self.events.publish(DebateEvent::RoundStart {
                        round,
                        total_rounds: max_rounds,
                    });
                    self.run_round(round, &order, None).await?;
                    self.events.publish(DebateEvent::RoundEnd { round });

                    if self.is_stopped() {
                        break;
                    }
                    if round >= 2
                        && self.agreement_eligible(&order)
                        && self.agreement.check(&self.topic, &self.transcript).await
                    {
                        info!(debate_id = %self.debate_id, round, "Agreement reached");
                        self.events
                            .publish(DebateEvent::AgreementReached { round });
                        break;
                    }
                }
            }
        }

        if !self.is_stopped() {
            self.generate_summary().await;
        }

        let status = if self.is_stopped() {
            DebateStatus::Stopped
        } else {
            DebateStatus::Completed
        };
        self.store.set_status(&self.debate_id, status).await?;
        self.events.publish(DebateEvent::DebateEnd { status });

        if status == DebateStatus::Completed {
            self.trigger_memory_extraction();
        }

        info!(debate_id = %self.debate_id, status = %status, "Debate finished");
        Ok(status)
    }

    /// One pass where every participant speaks once.
    async fn run_round(
        &mut self,
        round: u32,
        order: &[Participant],
        final_round: Option<u32>,
    ) -> Result<(), Error> {
        debug!(debate_id = %self.debate_id, round, "Running round");

        for participant in order {
            self.splice_interventions(round).await?;

            if self.is_stopped() {
                break;
            }

            let Some(provider) = self.providers.get(&participant.provider) else {
                warn!(
                    provider = %participant.provider,
                    participant = %participant.display_name,
                    "No credential configured, skipping turn"
                );
                self.events.publish(DebateEvent::ModelError {
                    model_name: participant.display_name.clone(),
                    provider: participant.provider.clone(),
                    error: format!("No API key configured for {}", participant.provider),
                });
                continue;
            };

            self.events.publish(DebateEvent::ModelStart {
                model_name: participant.display_name.clone(),
                provider: participant.provider.clone(),
                round,
            });

            match self
                .take_turn(provider, participant, round, final_round)
                .await
            {
                Ok(content) => {
                    let message = Message::participant(
                        round,
                        &participant.display_name,
                        &participant.provider,
                        content,
                    );
                    if let Err(e) = self.store.append_message(&self.debate_id, &message).await
                    {
                        warn!(
                            participant = %participant.display_name,
                            error = %e,
                            "Failed to persist message, skipping turn"
                        );
                        self.events.publish(DebateEvent::ModelError {
                            model_name: participant.display_name.clone(),
                            provider: participant.provider.clone(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                    self.transcript.push(message);
                    self.events.publish(DebateEvent::ModelEnd {
                        model_name: participant.display_name.clone(),
                        provider: participant.provider.clone(),
                        round,
                    });
                }
                Err(e) => {
                    warn!(
                        participant = %participant.display_name,
                        error = %e,
                        "Participant turn failed"
                    );
                    self.events.publish(DebateEvent::ModelError {
                        model_name: participant.display_name.clone(),
                        provider: participant.provider.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Stream one participant's response, forwarding chunks as they land.
    async fn take_turn(
        &self,
        provider: Arc<dyn Provider>,
        participant: &Participant,
        round: u32,
        final_round: Option<u32>,
    ) -> Result<String, ProviderError> {
        let system_prompt = context::system_prompt(participant, round, final_round);
        let turn_context = self.context_builder().build(&self.transcript, round);

        let mut request =
            GenerateRequest::prompt(&participant.model, turn_context, system_prompt);

        // Images are offered only in round 1, only to vision-capable
        // participants; later rounds never resend them.
        if round <= 1 && !self.images.is_empty() && participant.is_vision_capable() {
            request = request.with_images(self.images.clone());
        }

        let mut rx = provider.generate_stream(request).await?;
        let mut full = String::new();

        while let Some(chunk) = rx.recv().await {
            if self.is_stopped() {
                break;
            }
            let chunk = chunk?;
            full.push_str(&chunk);
            self.events.publish(DebateEvent::Chunk {
                model_name: participant.display_name.clone(),
                provider: participant.provider.clone(),
                content: chunk,
                round,
            });
        }

        Ok(full)
    }

    /// Record queued interventions ahead of the next turn.
    async fn splice_interventions(&mut self, round: u32) -> Result<(), Error> {
        for text in self.interventions.drain() {
            let message = Message::intervention(round, &text);
            self.store.append_message(&self.debate_id, &message).await?;
            self.transcript.push(message);
            self.events.publish(DebateEvent::UserIntervention {
                round,
                content: text,
            });
        }
        Ok(())
    }

    /// Agreement is only evaluated once every participant has at least
    /// two recorded messages.
    fn agreement_eligible(&self, order: &[Participant]) -> bool {
        order
            .iter()
            .all(|p| self.transcript.count_for_speaker(&p.display_name) >= 2)
    }

    /// Stream the final synthesis from the designated summarizer.
    ///
    /// Failure is reported via `summary_error` and never changes the
    /// overall debate status.
    async fn generate_summary(&mut self) {
        let Some(summarizer) = self.participants.get(self.summarizer_index).cloned() else {
            return;
        };
        let Some(provider) = self.providers.get(&summarizer.provider) else {
            debug!(
                provider = %summarizer.provider,
                "Summarizer has no credential, skipping summary"
            );
            return;
        };

        self.events.publish(DebateEvent::SummaryStart {
            model_name: summarizer.display_name.clone(),
        });

        match self.stream_summary(provider, &summarizer).await {
            Ok(content) => {
                let message = Message::summary(
                    &summarizer.display_name,
                    &summarizer.provider,
                    content,
                );
                if let Err(e) = self.store.append_message(&self.debate_id, &message).await {
                    warn!(error = %e, "Failed to persist summary");
                    self.events.publish(DebateEvent::SummaryError {
                        error: e.to_string(),
                    });
                    return;
                }
                self.transcript.push(message);
                self.events.publish(DebateEvent::SummaryEnd {
                    model_name: summarizer.display_name.clone(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Summary generation failed");
                self.events.publish(DebateEvent::SummaryError {
                    error: e.to_string(),
                });
            }
        }
    }

    async fn stream_summary(
        &self,
        provider: Arc<dyn Provider>,
        summarizer: &Participant,
    ) -> Result<String, ProviderError> {
        let system_prompt = context::summary_system_prompt(&summarizer.display_name);
        let summary_context = self.context_builder().summary(&self.transcript);

        let mut rx = provider
            .generate_stream(GenerateRequest::prompt(
                &summarizer.model,
                summary_context,
                system_prompt,
            ))
            .await?;

        let mut full = String::new();
        while let Some(chunk) = rx.recv().await {
            if self.is_stopped() {
                break;
            }
            let chunk = chunk?;
            full.push_str(&chunk);
            self.events.publish(DebateEvent::SummaryChunk {
                model_name: summarizer.display_name.clone(),
                content: chunk,
            });
        }

        Ok(full)
    }

    /// Spawn the detached fact-extraction task. Never awaited; its
    /// failure cannot reach the already-finalized debate.
    fn trigger_memory_extraction(&self) {
        let (Some(user_id), Some(facts)) = (&self.user_id, &self.facts) else {
            return;
        };

        debug!(debate_id = %self.debate_id, "Spawning memory extraction");
        parley_memory::spawn_extraction(
            self.providers.clone(),
            facts.clone(),
            self.debate_id.clone(),
            user_id.clone(),
            self.topic.clone(),
            self.transcript.clone(),
        );
    }

    fn context_builder(&self) -> ContextBuilder<'_> {
        ContextBuilder::new(&self.topic)
            .with_background(self.background.as_deref())
            .with_memory_note(self.memory_note.as_deref())
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
