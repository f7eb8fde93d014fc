//! Static provider knowledge: base URLs, model catalogs, and the
//! cheap-model preference order used for auxiliary calls.

/// Providers reachable through the OpenAI-compatible chat completions API.
pub const OPENAI_COMPAT_PROVIDERS: &[&str] = &["openai", "google", "deepseek", "xai"];

/// Preference order for auxiliary calls (agreement check, fact extraction):
/// fast and cheap first. The first entry whose provider has a registered
/// credential wins.
pub const FAST_MODELS: &[(&str, &str)] = &[
    ("google", "gemini-2.0-flash"),
    ("openai", "gpt-5-mini"),
    ("anthropic", "claude-haiku-4-5-20251001"),
    ("deepseek", "deepseek-chat"),
];

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider: &str) -> String {
    match provider {
        "openai" => "https://api.openai.com/v1".into(),
        "google" => "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "xai" => "https://api.x.ai/v1".into(),
        "anthropic" => "https://api.anthropic.com".into(),
        _ => format!("https://{provider}.api.example.com/v1"),
    }
}

/// Known debate-capable models per provider, used as the CLI catalog and
/// as the fallback where a backend has no model-listing endpoint.
pub fn known_models(provider: &str) -> Vec<&'static str> {
    match provider {
        "openai" => vec!["gpt-4o", "gpt-4o-mini", "gpt-4", "gpt-3.5-turbo"],
        "anthropic" => vec![
            "claude-sonnet-4-20250514",
            "claude-3-5-sonnet-20241022",
            "claude-3-opus-20240229",
        ],
        "google" => vec!["gemini-1.5-pro", "gemini-2.0-flash"],
        "deepseek" => vec!["deepseek-chat", "deepseek-reasoner"],
        "xai" => vec!["grok-2", "grok-beta"],
        _ => vec![],
    }
}

/// All provider ids Parley knows how to construct.
pub fn supported_providers() -> Vec<&'static str> {
    let mut providers = vec!["anthropic"];
    providers.extend_from_slice(OPENAI_COMPAT_PROVIDERS);
    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_urls_for_known_providers() {
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("deepseek").contains("api.deepseek.com"));
        assert!(default_base_url("google").contains("generativelanguage"));
    }

    #[test]
    fn every_fast_model_provider_is_supported() {
        let supported = supported_providers();
        for (provider, _) in FAST_MODELS {
            assert!(supported.contains(provider), "{provider} not constructible");
        }
    }

    #[test]
    fn catalog_covers_all_supported_providers() {
        for provider in supported_providers() {
            assert!(!known_models(provider).is_empty(), "{provider} has no models");
        }
    }
}
