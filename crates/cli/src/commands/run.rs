//! The `parley run` command — drive a debate and stream it to the terminal.
//!
//! Lines typed on stdin while the debate runs are submitted as user
//! interventions; Ctrl-C requests a cooperative stop.

use anyhow::{bail, Context};
use base64::Engine;
use clap::Args;
use parley_core::event::DebateEvent;
use parley_core::memory::{context_note, FactStore};
use parley_core::participant::Participant;
use parley_core::policy::TerminationPolicy;
use parley_core::provider::ImageAttachment;
use parley_core::store::DebateStore;
use parley_engine::DebateOrchestrator;
use parley_memory::{InMemoryDebateStore, JsonlDebateStore, JsonlFactStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

#[derive(Args)]
pub struct RunArgs {
    /// The debate topic or question
    #[arg(short, long)]
    topic: String,

    /// Participant spec `provider:model[:display-name]`, repeatable
    #[arg(short, long = "participant", required = true)]
    participants: Vec<String>,

    /// Number of debate rounds (fixed-round mode)
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Keep debating until the participants agree (capped by --max-rounds)
    #[arg(long, conflicts_with = "rounds")]
    until_agreement: bool,

    /// Round cap for --until-agreement
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Index of the participant that writes the final summary
    #[arg(long)]
    summarizer: Option<usize>,

    /// Image file to attach (round 1, vision-capable participants only)
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// User id for persistent memory (facts extracted after completion)
    #[arg(long)]
    user: Option<String>,

    /// File with background text from a previous conversation
    #[arg(long)]
    background: Option<PathBuf>,

    /// Starting round number (continuations of an earlier debate)
    #[arg(long)]
    start_round: Option<u32>,
}

pub async fn run(config: parley_config::AppConfig, args: RunArgs) -> anyhow::Result<()> {
    let registry = Arc::new(parley_providers::registry::build_from_config(&config));
    if registry.is_empty() {
        bail!(
            "No provider credentials configured. Set ANTHROPIC_API_KEY / OPENAI_API_KEY / \
             GOOGLE_API_KEY / DEEPSEEK_API_KEY / XAI_API_KEY or add keys to {}",
            parley_config::AppConfig::default_path().display()
        );
    }

    let participants = args
        .participants
        .iter()
        .map(|spec| parse_participant(spec))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let policy = if args.until_agreement {
        TerminationPolicy::until_agreement(
            args.max_rounds.unwrap_or(config.debate.max_rounds),
        )
    } else {
        TerminationPolicy::fixed_from(
            args.rounds.unwrap_or(config.debate.default_rounds),
            args.start_round.unwrap_or(1),
        )
    };

    let store: Arc<dyn DebateStore> = match config.storage.backend.as_str() {
        "memory" => Arc::new(InMemoryDebateStore::new()),
        _ => Arc::new(JsonlDebateStore::new(
            config
                .storage
                .dir
                .clone()
                .unwrap_or_else(JsonlDebateStore::default_dir),
        )),
    };

    let events = Arc::new(parley_core::event::EventBus::new(1024));

    let mut orchestrator = DebateOrchestrator::new(
        &args.topic,
        participants,
        policy,
        registry.clone(),
        store,
        events.clone(),
    )
    .with_summarizer(args.summarizer.unwrap_or(config.debate.summarizer_index))
    .with_agreement_checker(
        parley_engine::AgreementChecker::new(registry)
            .with_excerpt_chars(config.agreement.excerpt_chars),
    );

    if !args.images.is_empty() {
        orchestrator = orchestrator.with_images(load_images(&args.images)?);
    }

    if let Some(path) = &args.background {
        let background = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read background file {}", path.display()))?;
        orchestrator = orchestrator.with_background(background);
    }

    if let Some(user_id) = &args.user {
        let facts = Arc::new(JsonlFactStore::new(
            JsonlDebateStore::default_dir().join("memory"),
        ));
        let note = context_note(&facts.facts_for(user_id).await.unwrap_or_default());
        if !note.is_empty() {
            orchestrator = orchestrator.with_memory_note(note);
        }
        orchestrator = orchestrator.with_user_memory(user_id, facts);
    }

    println!("Debate: {}", args.topic);
    println!("(type a line to intervene, Ctrl-C to stop)\n");

    let handle = orchestrator.handle();
    let printer = spawn_event_printer(events.clone());
    let stdin_task = spawn_stdin_interventions(handle.clone());
    let ctrl_c = {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nStopping debate...");
                handle.stop();
            }
        })
    };

    let status = orchestrator.run().await;

    // Give the printer a moment to flush trailing events
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    printer.abort();
    stdin_task.abort();
    ctrl_c.abort();

    println!();
    if status != parley_core::store::DebateStatus::Completed {
        std::process::exit(1);
    }
    Ok(())
}

/// Parse `provider:model[:display-name]`.
fn parse_participant(spec: &str) -> anyhow::Result<Participant> {
    let parts: Vec<&str> = spec.splitn(3, ':').collect();
    match parts.as_slice() {
        [provider, model] => Ok(Participant::new(*provider, *model, *model)),
        [provider, model, name] => Ok(Participant::new(*provider, *model, *name)),
        _ => bail!("Invalid participant spec '{spec}' (expected provider:model[:name])"),
    }
}

fn load_images(paths: &[PathBuf]) -> anyhow::Result<Vec<ImageAttachment>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            Ok(ImageAttachment {
                base64: base64::engine::general_purpose::STANDARD.encode(bytes),
                media_type: media_type_for(path),
            })
        })
        .collect()
}

fn media_type_for(path: &Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png".into(),
        Some("jpg") | Some("jpeg") => "image/jpeg".into(),
        Some("gif") => "image/gif".into(),
        Some("webp") => "image/webp".into(),
        _ => "image/png".into(),
    }
}

fn spawn_event_printer(
    events: Arc<parley_core::event::EventBus>,
) -> tokio::task::JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event.as_ref() {
                DebateEvent::RoundStart { round, total_rounds } => {
                    println!("\n══ Round {round}/{total_rounds} ══");
                }
                DebateEvent::ModelStart { model_name, .. } => {
                    println!("\n· {model_name}:");
                }
                DebateEvent::Chunk { content, .. } => {
                    print!("{content}");
                    let _ = std::io::stdout().flush();
                }
                DebateEvent::ModelEnd { .. } => println!(),
                DebateEvent::ModelError {
                    model_name, error, ..
                } => {
                    eprintln!("\n[{model_name}] skipped: {error}");
                }
                DebateEvent::UserIntervention { content, .. } => {
                    println!("\n> User: {content}");
                }
                DebateEvent::AgreementReached { round } => {
                    println!("\n✔ Agreement reached after round {round}");
                }
                DebateEvent::SummaryStart { model_name } => {
                    println!("\n══ Summary ({model_name}) ══");
                }
                DebateEvent::SummaryChunk { content, .. } => {
                    print!("{content}");
                    let _ = std::io::stdout().flush();
                }
                DebateEvent::SummaryEnd { .. } => println!(),
                DebateEvent::SummaryError { error } => {
                    eprintln!("\nSummary failed: {error}");
                }
                DebateEvent::DebateEnd { status } => {
                    println!("\nDebate {status}.");
                }
                DebateEvent::Error { message } => {
                    eprintln!("\nDebate error: {message}");
                }
                DebateEvent::RoundEnd { .. } | DebateEvent::InterventionReceived { .. } => {}
            }
        }
    })
}

fn spawn_stdin_interventions(
    handle: parley_engine::DebateHandle,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if !line.is_empty() {
                handle.intervene(line);
            }
        }
    })
}
