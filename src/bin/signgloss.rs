// signgloss - translate ASL gloss tokens into English from the command line

use clap::{Parser, Subcommand};
use serde::Serialize;
use signgloss::completion::build_backend;
use signgloss::config::{AppConfig, BackendKind, EmptyInputPolicy};
use signgloss::service::{GlossService, ServiceOutcome};
use signgloss::{PipelineOrchestrator, ProcessingResult, SharedVocabulary};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Translate ASL gloss tokens into natural English", long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Vocabulary dataset (JSON) (overrides config)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Completion backend (overrides config)
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendKind>,

    /// Model name (overrides config)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Backend base URL (overrides config)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run tokens through the full pipeline
    Translate {
        /// Gloss tokens in signing order, e.g. YOU NAME WHAT
        tokens: Vec<String>,

        /// Send an empty token list to the pipeline instead of rejecting it
        #[arg(long)]
        allow_empty: bool,
    },
    /// Check tokens against the vocabulary without calling the model
    Validate {
        tokens: Vec<String>,
    },
    /// Show the vocabulary dataset
    Vocab {
        /// Print every token instead of a sample
        #[arg(long)]
        all: bool,
    },
    /// Report backend and dataset status
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (API keys) if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("signgloss={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AppConfig::load(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(dataset) = args.dataset {
        config.dataset.path = dataset;
    }
    if let Some(backend) = args.backend {
        config.completion.backend = backend;
    }
    if let Some(model) = args.model {
        config.completion.model = Some(model);
    }
    if let Some(endpoint) = args.endpoint {
        config.completion.endpoint = Some(endpoint);
    }
    if let Command::Translate { allow_empty: true, .. } = args.command {
        config.service.empty_input = EmptyInputPolicy::Proceed;
    }

    // The process must not serve requests without a vocabulary
    let store = SharedVocabulary::from_path(&config.dataset.path).get().await?;
    tracing::info!(
        "Loaded {} tokens from {}",
        store.len(),
        config.dataset.path.display()
    );

    let completion = build_backend(&config.completion, config.pipeline.stage_timeout())?;
    let orchestrator = PipelineOrchestrator::new(store, completion, config.pipeline.clone())?;
    let service = GlossService::new(Arc::new(orchestrator), config.service.clone());

    match args.command {
        Command::Translate { tokens, .. } => {
            let outcome = service.process_tokens(&tokens).await;
            let succeeded = matches!(
                outcome,
                ServiceOutcome::Completed {
                    result: ProcessingResult::Success { .. }
                }
            );

            if args.json {
                print_json(&outcome)?;
            } else {
                print_outcome(&outcome);
            }

            if !succeeded {
                std::process::exit(1);
            }
        }
        Command::Validate { tokens } => {
            let summary = service.validate_tokens(&tokens);
            if args.json {
                print_json(&summary)?;
            } else {
                for check in &summary.validation_results {
                    match &check.normalized {
                        Some(normalized) => println!("✓ {} -> {}", check.token, normalized),
                        None => println!("✗ {} (unknown)", check.token),
                    }
                }
                println!(
                    "\n{} token(s): {} valid, {} unknown",
                    summary.summary.total_tokens,
                    summary.summary.valid_count,
                    summary.summary.invalid_count
                );
            }
        }
        Command::Vocab { all } => {
            if all {
                let entries = service.orchestrator().store().list_all();
                if args.json {
                    print_json(&entries)?;
                } else {
                    for entry in entries {
                        match &entry.metadata.category {
                            Some(category) => println!("{} ({})", entry.token, category),
                            None => println!("{}", entry.token),
                        }
                    }
                }
            } else {
                let info = service.dataset_info();
                if args.json {
                    print_json(&info)?;
                } else {
                    println!("{}: {} tokens", info.description, info.total_words);
                    println!("Sample: {}", info.sample_words.join(", "));
                }
            }
        }
        Command::Health => {
            let health = service.health();
            if args.json {
                print_json(&health)?;
            } else {
                println!("Status: {:?}", health.status);
                println!("Message: {}", health.message);
                println!("Backend: {}", health.backend);
                println!("Dataset size: {}", health.asl_dataset_size);
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_outcome(outcome: &ServiceOutcome) {
    match outcome {
        ServiceOutcome::Rejected { error } => eprintln!("Rejected: {}", error),
        ServiceOutcome::Completed { result } => match result {
            ProcessingResult::Success { sentence } => println!("{}", sentence),
            ProcessingResult::Failure {
                stage,
                reason,
                detail,
            } => {
                eprintln!("Failed at {}: {}", stage, reason);
                if let Some(detail) = detail {
                    eprintln!("  {}", detail);
                }
            }
        },
    }
}
