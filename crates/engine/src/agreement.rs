//! Agreement checker — asks a cheap model whether the debate has converged.
//!
//! The verdict heuristic is deliberately replaceable: the checker model is
//! instructed to answer with a single word, but models drift, so the
//! parsing rule lives behind the `ConsensusRule` trait. Every failure mode
//! (no second voice, no credentialed checker model, network error) fails
//! closed to "no agreement" — the discussion keeps going rather than
//! ending prematurely.

use parley_core::message::Transcript;
use parley_core::provider::GenerateRequest;
use parley_providers::catalog::FAST_MODELS;
use parley_providers::ProviderRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_EXCERPT_CHARS: usize = 500;

const CHECKER_SYSTEM_PROMPT: &str = "You are a strict classifier. You will be shown the \
    latest position of each participant in a debate. Decide whether the participants have \
    converged on substantively the same conclusion. Respond with exactly one word: AGREE \
    if they have reached agreement, or DISAGREE if meaningful disagreement remains.";

/// How a raw checker response is turned into a verdict.
pub trait ConsensusRule: Send + Sync {
    fn is_agreement(&self, verdict: &str) -> bool;
}

/// Default keyword rule: the response signals agreement when it contains
/// "AGREE" (case-insensitive) and does not contain "DISAGREE" — the bare
/// substring test would classify the literal answer "DISAGREE" as
/// agreement.
pub struct KeywordConsensus;

impl ConsensusRule for KeywordConsensus {
    fn is_agreement(&self, verdict: &str) -> bool {
        let upper = verdict.to_uppercase();
        upper.contains("AGREE") && !upper.contains("DISAGREE")
    }
}

/// Classifies convergence over the latest position of each participant.
pub struct AgreementChecker {
    providers: Arc<ProviderRegistry>,
    excerpt_chars: usize,
    rule: Box<dyn ConsensusRule>,
}

impl AgreementChecker {
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self {
            providers,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            rule: Box::new(KeywordConsensus),
        }
    }

    /// Override the per-participant excerpt length.
    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Swap the verdict-parsing strategy.
    pub fn with_rule(mut self, rule: Box<dyn ConsensusRule>) -> Self {
        self.rule = rule;
        self
    }

    /// Check whether the debate has converged. Fails closed.
    pub async fn check(&self, topic: &str, transcript: &Transcript) -> bool {
        let voices = transcript.latest_per_speaker();
        if voices.len() < 2 {
            return false;
        }

        let Some((provider_id, model)) = FAST_MODELS
            .iter()
            .find(|(provider, _)| self.providers.has(provider))
        else {
            debug!("No credentialed checker model, assuming disagreement");
            return false;
        };

        let Some(provider) = self.providers.get(provider_id) else {
            return false;
        };

        let mut positions = String::new();
        for (speaker, content) in &voices {
            positions.push_str(&format!(
                "{speaker}:\n{}\n\n",
                truncate_chars(content, self.excerpt_chars)
            ));
        }

        let prompt = format!(
            "DEBATE TOPIC: {topic}\n\nLATEST POSITIONS:\n\n{positions}Have these \
             participants reached substantive agreement? Answer with exactly one word: \
             AGREE or DISAGREE."
        );

        match provider
            .generate(GenerateRequest::prompt(*model, prompt, CHECKER_SYSTEM_PROMPT))
            .await
        {
            Ok(verdict) => {
                let agreed = self.rule.is_agreement(&verdict);
                debug!(model = %model, verdict = %verdict.trim(), agreed, "Agreement check");
                agreed
            }
            Err(e) => {
                warn!(error = %e, "Agreement check failed, assuming disagreement");
                false
            }
        }
    }
}

/// Truncate to at most `max` chars, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
