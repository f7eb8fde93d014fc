//! Participant domain type and vision-capability rules.

use serde::{Deserialize, Serialize};

/// One configured AI voice in a debate.
///
/// Immutable for the debate's lifetime. Order in the participant list is
/// significant; it may be permuted once (vision-first) when images are
/// attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Provider id (e.g., "anthropic", "openai")
    pub provider: String,

    /// Model id passed to the provider (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    /// Display name used as the transcript speaker label
    pub display_name: String,

    /// Optional assigned perspective/role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Participant {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            display_name: display_name.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Whether this participant's backend accepts image inputs.
    pub fn is_vision_capable(&self) -> bool {
        is_vision_capable(&self.provider, &self.model)
    }
}

/// Allow-list check for vision-capable provider/model pairs.
///
/// Prefix-matched so dated model ids ("claude-sonnet-4-20250514") resolve
/// without enumerating every release.
pub fn is_vision_capable(provider: &str, model: &str) -> bool {
    match provider {
        "anthropic" => {
            model.starts_with("claude-3")
                || model.starts_with("claude-sonnet")
                || model.starts_with("claude-opus")
                || model.starts_with("claude-haiku")
        }
        "openai" => model.starts_with("gpt-4o") || model.starts_with("gpt-4"),
        "google" => model.starts_with("gemini"),
        _ => false,
    }
}

/// Stably partition participants vision-capable-first.
///
/// Relative order within each partition is preserved, so an early
/// participant can actually see an attached image.
pub fn vision_first(participants: &[Participant]) -> Vec<Participant> {
    let (vision, rest): (Vec<_>, Vec<_>) = participants
        .iter()
        .cloned()
        .partition(Participant::is_vision_capable);

    let mut ordered = vision;
    ordered.extend(rest);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vision_allow_list() {
        assert!(is_vision_capable("anthropic", "claude-sonnet-4-20250514"));
        assert!(is_vision_capable("openai", "gpt-4o-mini"));
        assert!(is_vision_capable("google", "gemini-1.5-pro"));
        assert!(!is_vision_capable("deepseek", "deepseek-chat"));
        assert!(!is_vision_capable("xai", "grok-2"));
    }

    #[test]
    fn vision_first_is_stable() {
        let participants = vec![
            Participant::new("deepseek", "deepseek-chat", "Deepseek"),
            Participant::new("openai", "gpt-4o", "GPT-4o"),
            Participant::new("xai", "grok-2", "Grok"),
            Participant::new("anthropic", "claude-sonnet-4-20250514", "Claude"),
        ];

        let ordered = vision_first(&participants);
        let names: Vec<&str> = ordered.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, vec!["GPT-4o", "Claude", "Deepseek", "Grok"]);
    }

    #[test]
    fn vision_first_no_vision_models_keeps_order() {
        let participants = vec![
            Participant::new("deepseek", "deepseek-chat", "A"),
            Participant::new("xai", "grok-2", "B"),
        ];
        let ordered = vision_first(&participants);
        let names: Vec<&str> = ordered.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn participant_role_serialization() {
        let p = Participant::new("anthropic", "claude-sonnet-4-20250514", "Claude")
            .with_role("devil's advocate");
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("devil's advocate"));

        let bare = Participant::new("openai", "gpt-4o", "GPT-4o");
        let json = serde_json::to_string(&bare).unwrap();
        assert!(!json.contains("role"));
    }
}
