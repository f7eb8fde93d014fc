//! Termination policies — when a debate stops generating rounds.

use serde::{Deserialize, Serialize};

/// How a debate decides it is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TerminationPolicy {
    /// Execute exactly `rounds` rounds, starting at `start_round`
    /// (continuations of a previous debate start above 1).
    FixedRounds { rounds: u32, start_round: u32 },

    /// Loop up to `max_rounds`, stopping early once the agreement check
    /// returns a positive verdict. Agreement is never evaluated before
    /// round 2, and only once every participant has produced at least
    /// two messages.
    UntilAgreement { max_rounds: u32 },
}

impl TerminationPolicy {
    /// A fixed-round debate starting at round 1.
    pub fn fixed(rounds: u32) -> Self {
        Self::FixedRounds {
            rounds,
            start_round: 1,
        }
    }

    /// A fixed-round continuation starting at `start_round`.
    pub fn fixed_from(rounds: u32, start_round: u32) -> Self {
        Self::FixedRounds {
            rounds,
            start_round: start_round.max(1),
        }
    }

    /// An agreement-seeking debate with a hard round cap.
    pub fn until_agreement(max_rounds: u32) -> Self {
        Self::UntilAgreement { max_rounds }
    }

    /// The first round number this policy will run.
    pub fn first_round(&self) -> u32 {
        match self {
            Self::FixedRounds { start_round, .. } => (*start_round).max(1),
            Self::UntilAgreement { .. } => 1,
        }
    }

    /// The last round number this policy can reach.
    pub fn final_round(&self) -> u32 {
        match self {
            Self::FixedRounds { rounds, .. } => {
                self.first_round() + rounds.saturating_sub(1)
            }
            Self::UntilAgreement { max_rounds } => *max_rounds,
        }
    }

    /// Whether this policy runs an agreement check after eligible rounds.
    pub fn seeks_agreement(&self) -> bool {
        matches!(self, Self::UntilAgreement { .. })
    }
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::fixed(3)
    }
}
