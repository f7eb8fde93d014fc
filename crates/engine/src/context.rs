//! Context builder — the prompt each participant sees at each round.
//!
//! Round 1 is the "opening": participants answer independently, so other
//! participants' round-1 output is withheld and opinions form without
//! anchoring. Rounds ≥ 2 are "convergence": the full labeled transcript
//! is shown with an instruction to find common ground.

use parley_core::message::Transcript;
use parley_core::participant::Participant;

/// Builds per-turn context strings from the topic and transcript.
pub struct ContextBuilder<'a> {
    topic: &'a str,
    background: Option<&'a str>,
    memory_note: Option<&'a str>,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(topic: &'a str) -> Self {
        Self {
            topic,
            background: None,
            memory_note: None,
        }
    }

    /// Transcript text carried over from a previous continued conversation.
    pub fn with_background(mut self, background: Option<&'a str>) -> Self {
        self.background = background.filter(|s| !s.is_empty());
        self
    }

    /// Short persistent note about the user (name, profession).
    pub fn with_memory_note(mut self, note: Option<&'a str>) -> Self {
        self.memory_note = note.filter(|s| !s.is_empty());
        self
    }

    /// The context for the given round.
    pub fn build(&self, transcript: &Transcript, round: u32) -> String {
        if round <= 1 {
            self.opening(transcript)
        } else {
            self.convergence(transcript, round)
        }
    }

    /// Round-1 context: independent opening statements.
    ///
    /// Contains no other participant's output. Prior user interventions
    /// are visible; background and the memory note are prepended.
    fn opening(&self, transcript: &Transcript) -> String {
        let mut context = String::new();

        if let Some(note) = self.memory_note {
            context.push_str(&format!("WHAT YOU KNOW ABOUT THE USER:\n{note}\n\n"));
        }

        if let Some(background) = self.background {
            context.push_str(&format!(
                "BACKGROUND FROM AN EARLIER CONVERSATION:\n{background}\n\n"
            ));
        }

        context.push_str(&format!("DEBATE TOPIC: {}\n\n", self.topic));

        let interventions: Vec<&str> = transcript
            .debate_messages()
            .filter(|m| m.is_intervention())
            .map(|m| m.content.as_str())
            .collect();
        if !interventions.is_empty() {
            context.push_str("THE USER HAS ADDED:\n");
            for text in interventions {
                context.push_str(&format!("- {text}\n"));
            }
            context.push('\n');
        }

        context.push_str("Please provide your initial response to this topic.");
        context
    }

    /// Round ≥ 2 context: full transcript, convergence instruction.
    fn convergence(&self, transcript: &Transcript, round: u32) -> String {
        let mut context = String::new();

        if let Some(background) = self.background {
            context.push_str(&format!(
                "BACKGROUND FROM AN EARLIER CONVERSATION:\n{background}\n\n"
            ));
        }

        context.push_str(&format!("DEBATE TOPIC: {}\n\n", self.topic));
        context.push_str("PREVIOUS DISCUSSION:\n\n");

        for msg in transcript.debate_messages() {
            context.push_str(&format!(
                "[Round {}] {}:\n{}\n\n",
                msg.round, msg.speaker, msg.content
            ));
        }

        context.push_str(&format!(
            "---\nPlease provide your Round {round} response. Find common ground where it \
             exists, acknowledge good points made by others, and state any remaining \
             disagreement explicitly."
        ));
        context
    }

    /// The context for the final synthesis over the full transcript.
    pub fn summary(&self, transcript: &Transcript) -> String {
        let mut context = format!(
            "DEBATE TOPIC: {}\n\nFULL DEBATE TRANSCRIPT:\n\n",
            self.topic
        );

        for msg in transcript.debate_messages() {
            context.push_str(&format!(
                "[Round {}] {}:\n{}\n\n",
                msg.round, msg.speaker, msg.content
            ));
        }

        context.push_str("---\nPlease provide a concise summary of this debate.");
        context
    }
}

/// The system prompt for a participant's turn.
pub fn system_prompt(participant: &Participant, round: u32, final_round: Option<u32>) -> String {
    let mut prompt = format!(
        "You are {} participating in a structured debate.",
        participant.display_name
    );

    if let Some(role) = &participant.role {
        prompt.push_str(&format!(" Your assigned perspective/role is: {role}."));
    }

    if round <= 1 {
        prompt.push_str(" This is Round 1. Provide your initial thoughts on the topic.");
    } else if final_round == Some(round) {
        prompt.push_str(&format!(
            " This is the final round (Round {round}). Work toward a synthesis or \
             conclusion, acknowledging points of agreement and remaining disagreements."
        ));
    } else {
        prompt.push_str(&format!(
            " This is Round {round}. Respond to the other participants' arguments, refine \
             your position, and engage constructively with different viewpoints."
        ));
    }

    prompt.push_str(" Be concise but thorough. Focus on substance over rhetoric.");
    prompt
}

/// The system prompt for the final synthesis.
pub fn summary_system_prompt(model_name: &str) -> String {
    format!(
        "You are {model_name}. Your task is to provide a balanced summary of the debate \
         that just concluded. Highlight key arguments, points of agreement, remaining \
         disagreements, and any conclusions reached."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::message::Message;

    fn transcript_with_round_one() -> Transcript {
        let mut t = Transcript::default();
        t.push(Message::participant(1, "Claude", "anthropic", "claude-opening"));
        t.push(Message::participant(1, "GPT-4o", "openai", "gpt-opening"));
        t
    }

    #[test]
    fn opening_withholds_other_participants() {
        let transcript = transcript_with_round_one();
        let context = ContextBuilder::new("Is tea better than coffee?").build(&transcript, 1);

        assert!(context.contains("DEBATE TOPIC: Is tea better than coffee?"));
        assert!(!context.contains("claude-opening"));
        assert!(!context.contains("gpt-opening"));
        assert!(context.contains("initial response"));
    }

    #[test]
    fn opening_includes_interventions() {
        let mut transcript = Transcript::default();
        transcript.push(Message::participant(1, "Claude", "anthropic", "claude-opening"));
        transcript.push(Message::intervention(1, "please consider caffeine content"));

        let context = ContextBuilder::new("topic").build(&transcript, 1);
        assert!(context.contains("please consider caffeine content"));
        assert!(!context.contains("claude-opening"));
    }

    #[test]
    fn opening_prepends_memory_and_background() {
        let transcript = Transcript::default();
        let context = ContextBuilder::new("topic")
            .with_memory_note(Some("Name: Michael"))
            .with_background(Some("earlier we discussed X"))
            .build(&transcript, 1);

        assert!(context.contains("WHAT YOU KNOW ABOUT THE USER:\nName: Michael"));
        assert!(context.contains("BACKGROUND FROM AN EARLIER CONVERSATION:\nearlier we discussed X"));

        let note_pos = context.find("Name: Michael").unwrap();
        let topic_pos = context.find("DEBATE TOPIC").unwrap();
        assert!(note_pos < topic_pos);
    }

    #[test]
    fn empty_memory_note_is_dropped() {
        let transcript = Transcript::default();
        let context = ContextBuilder::new("topic")
            .with_memory_note(Some(""))
            .build(&transcript, 1);
        assert!(!context.contains("WHAT YOU KNOW ABOUT THE USER"));
    }

    #[test]
    fn convergence_shows_full_labeled_transcript() {
        let transcript = transcript_with_round_one();
        let context = ContextBuilder::new("topic").build(&transcript, 2);

        assert!(context.contains("[Round 1] Claude:\nclaude-opening"));
        assert!(context.contains("[Round 1] GPT-4o:\ngpt-opening"));
        assert!(context.contains("Round 2 response"));
        assert!(context.contains("common ground"));
        assert!(context.contains("remaining"));
    }

    #[test]
    fn convergence_keeps_background_for_continuations() {
        let transcript = Transcript::default();
        let context = ContextBuilder::new("topic")
            .with_background(Some("rounds 1-3 happened elsewhere"))
            .build(&transcript, 4);
        assert!(context.contains("rounds 1-3 happened elsewhere"));
    }

    #[test]
    fn summary_includes_everything() {
        let mut transcript = transcript_with_round_one();
        transcript.push(Message::participant(2, "Claude", "anthropic", "claude-second"));

        let context = ContextBuilder::new("topic").summary(&transcript);
        assert!(context.contains("FULL DEBATE TRANSCRIPT"));
        assert!(context.contains("claude-opening"));
        assert!(context.contains("claude-second"));
        assert!(context.contains("concise summary"));
    }

    #[test]
    fn system_prompt_round_stages() {
        let p = Participant::new("anthropic", "claude-sonnet-4-20250514", "Claude");

        let opening = system_prompt(&p, 1, Some(3));
        assert!(opening.contains("Round 1"));
        assert!(opening.contains("initial thoughts"));

        let middle = system_prompt(&p, 2, Some(3));
        assert!(middle.contains("Round 2"));
        assert!(middle.contains("engage constructively"));

        let last = system_prompt(&p, 3, Some(3));
        assert!(last.contains("final round"));

        // Agreement-seeking debates have no known final round
        let open_ended = system_prompt(&p, 5, None);
        assert!(open_ended.contains("Round 5"));
        assert!(!open_ended.contains("final round"));
    }

    #[test]
    fn system_prompt_includes_role() {
        let p = Participant::new("openai", "gpt-4o", "GPT-4o").with_role("the skeptic");
        let prompt = system_prompt(&p, 1, None);
        assert!(prompt.contains("Your assigned perspective/role is: the skeptic."));
    }

    #[test]
    fn summary_system_prompt_names_the_model() {
        let prompt = summary_system_prompt("Claude");
        assert!(prompt.starts_with("You are Claude."));
        assert!(prompt.contains("balanced summary"));
    }
}
