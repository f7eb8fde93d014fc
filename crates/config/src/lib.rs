//! Configuration loading, validation, and management for Parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides for API keys (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`,
//! `GOOGLE_API_KEY`, `DEEPSEEK_API_KEY`, `XAI_API_KEY`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Providers whose keys can arrive via the environment.
const ENV_KEYS: &[(&str, &str)] = &[
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("openai", "OPENAI_API_KEY"),
    ("google", "GOOGLE_API_KEY"),
    ("deepseek", "DEEPSEEK_API_KEY"),
    ("xai", "XAI_API_KEY"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-provider credentials and endpoint overrides
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Debate defaults
    #[serde(default)]
    pub debate: DebateConfig,

    /// Agreement-check tuning
    #[serde(default)]
    pub agreement: AgreementConfig,

    /// Transcript storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for this provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override (proxies, self-hosted endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Rounds for fixed-round debates
    #[serde(default = "default_rounds")]
    pub default_rounds: u32,

    /// Hard cap for agreement-seeking debates
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Index of the participant designated to summarize
    #[serde(default)]
    pub summarizer_index: usize,
}

fn default_rounds() -> u32 {
    3
}
fn default_max_rounds() -> u32 {
    10
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            default_rounds: default_rounds(),
            max_rounds: default_max_rounds(),
            summarizer_index: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementConfig {
    /// Per-participant excerpt length (chars) sent to the checker model
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

fn default_excerpt_chars() -> usize {
    500
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Transcript backend: "jsonl" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Directory for JSONL transcripts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_storage_backend() -> String {
    "jsonl".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            dir: None,
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("providers", &self.providers)
            .field("debate", &self.debate)
            .field("agreement", &self.agreement)
            .field("storage", &self.storage)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl AppConfig {
    /// Default config path: `~/.parley/config.toml`.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".parley").join("config.toml")
    }

    /// Load configuration from the default path with env overrides.
    ///
    /// A missing file yields defaults; a malformed file is an error.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific path with env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Overlay API keys from the environment. Env keys win over file keys.
    fn apply_env_overrides(&mut self) {
        for (provider, var) in ENV_KEYS {
            if let Ok(key) = std::env::var(var) {
                if key.is_empty() {
                    continue;
                }
                self.providers
                    .entry(provider.to_string())
                    .or_insert(ProviderConfig {
                        api_key: None,
                        api_url: None,
                    })
                    .api_key = Some(key);
            }
        }
    }

    /// The provider-id → API-key map for providers that have a key.
    pub fn credentials(&self) -> HashMap<String, String> {
        self.providers
            .iter()
            .filter_map(|(id, p)| {
                p.api_key
                    .as_ref()
                    .filter(|k| !k.is_empty())
                    .map(|k| (id.clone(), k.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.debate.default_rounds, 3);
        assert_eq!(config.debate.max_rounds, 10);
        assert_eq!(config.debate.summarizer_index, 0);
        assert_eq!(config.agreement.excerpt_chars, 500);
        assert_eq!(config.storage.backend, "jsonl");
    }

    #[test]
    fn load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[providers.anthropic]
api_key = "sk-ant-test"

[debate]
default_rounds = 5

[agreement]
excerpt_chars = 300
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.debate.default_rounds, 5);
        assert_eq!(config.agreement.excerpt_chars, 300);
        assert_eq!(
            config.providers["anthropic"].api_key.as_deref(),
            Some("sk-ant-test")
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load_from(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.debate.default_rounds, 3);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not valid toml [[[").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn credentials_filters_empty_keys() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-1".into()),
                api_url: None,
            },
        );
        config.providers.insert(
            "xai".into(),
            ProviderConfig {
                api_key: Some(String::new()),
                api_url: None,
            },
        );

        let creds = config.credentials();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds["openai"], "sk-1");
    }

    #[test]
    fn debug_redacts_api_keys() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-secret".into()),
                api_url: None,
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
