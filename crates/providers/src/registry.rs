//! Provider registry — maps provider ids to constructed backends.
//!
//! Resolved once at debate setup from the credential map: a participant
//! whose provider id is absent here simply has no credential, which the
//! orchestrator reports as a non-fatal `model_error`.

use crate::anthropic::AnthropicProvider;
use crate::catalog::{default_base_url, supported_providers};
use crate::openai_compat::OpenAiCompatProvider;
use parley_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Dispatches provider ids to backend instances.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under an id.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get a provider by id.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Whether a credentialed provider exists for this id.
    pub fn has(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// All registered provider ids, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Build a registry from a provider-id → API-key map.
///
/// Unknown provider ids and empty keys are skipped with a warning rather
/// than failing setup — the debate degrades to `model_error` events for
/// the affected participants.
pub fn from_credentials(credentials: &HashMap<String, String>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    for (provider_id, api_key) in credentials {
        if api_key.is_empty() {
            continue;
        }

        if !supported_providers().contains(&provider_id.as_str()) {
            warn!(provider = %provider_id, "Skipping unknown provider id");
            continue;
        }

        let provider: Arc<dyn Provider> = if provider_id == "anthropic" {
            Arc::new(AnthropicProvider::new(api_key))
        } else {
            Arc::new(OpenAiCompatProvider::new(
                provider_id,
                default_base_url(provider_id),
                api_key,
            ))
        };

        registry.register(provider_id.clone(), provider);
    }

    registry
}

/// Build a registry from application configuration.
///
/// Per-provider base-URL overrides apply; providers without a key are
/// left unregistered.
pub fn build_from_config(config: &parley_config::AppConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    for (provider_id, provider_config) in &config.providers {
        let Some(api_key) = provider_config.api_key.as_ref().filter(|k| !k.is_empty())
        else {
            continue;
        };

        if !supported_providers().contains(&provider_id.as_str()) {
            warn!(provider = %provider_id, "Skipping unknown provider id");
            continue;
        }

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider_id));

        let provider: Arc<dyn Provider> = if provider_id == "anthropic" {
            let mut p = AnthropicProvider::new(api_key);
            if provider_config.api_url.is_some() {
                p = p.with_base_url(&base_url);
            }
            Arc::new(p)
        } else {
            Arc::new(OpenAiCompatProvider::new(provider_id, &base_url, api_key))
        };

        registry.register(provider_id.clone(), provider);
    }

    registry
}
