//! LLM Provider implementations for Parley.
//!
//! All providers implement the `parley_core::Provider` trait.
//! The registry maps provider ids to constructed backends, resolved once
//! from the credential map at debate setup.

pub mod anthropic;
pub mod catalog;
pub mod openai_compat;
pub mod registry;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use registry::ProviderRegistry;
