//! The `parley providers` command — catalog and credential checks.

use clap::Subcommand;
use parley_providers::catalog::{known_models, supported_providers};

#[derive(Subcommand)]
pub enum ProvidersAction {
    /// List supported providers, their models, and credential status
    List,

    /// Test configured credentials against the live backends
    Test {
        /// Test only this provider
        provider: Option<String>,
    },
}

pub async fn run(
    config: parley_config::AppConfig,
    action: ProvidersAction,
) -> anyhow::Result<()> {
    let registry = parley_providers::registry::build_from_config(&config);

    match action {
        ProvidersAction::List => {
            for provider in supported_providers() {
                let status = if registry.has(provider) {
                    "configured"
                } else {
                    "no key"
                };
                println!("{provider} ({status})");
                for model in known_models(provider) {
                    println!("  - {model}");
                }
            }
        }
        ProvidersAction::Test { provider } => {
            let targets: Vec<String> = match provider {
                Some(name) => vec![name],
                None => registry.names().iter().map(|s| s.to_string()).collect(),
            };

            if targets.is_empty() {
                println!("No providers configured.");
                return Ok(());
            }

            for name in targets {
                let Some(backend) = registry.get(&name) else {
                    println!("{name}: no key configured");
                    continue;
                };
                match backend.test_connection().await {
                    Ok(true) => println!("{name}: ok"),
                    Ok(false) => println!("{name}: rejected"),
                    Err(e) => println!("{name}: failed ({e})"),
                }
            }
        }
    }

    Ok(())
}
