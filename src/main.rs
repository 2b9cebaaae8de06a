use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use probability_compass::{
    config::{Config, LogFormat},
    guard::FlightOutcome,
    history::{HistoryEntry, HistoryLedger},
    presentation,
    prompts::{APP_NAME, DISCLAIMER_TEXT, EXAMPLE_QUESTIONS},
    AppState, ChatOutcome, ConfidenceBias, Query, SourcePreference,
};

/// Search-grounded probability estimates for future and past events.
#[derive(Parser, Debug)]
#[command(name = "compass", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a structured probability analysis
    Analyze {
        /// The question to analyze
        question: String,

        /// Source preference: balanced, polymarket, kalshi, historical
        #[arg(long, default_value = "balanced")]
        source: SourcePreference,

        /// Confidence bias: auto, conservative, optimistic, financial, tech
        #[arg(long, default_value = "auto")]
        bias: ConfidenceBias,

        /// Keywords to focus the web search on
        #[arg(long, default_value = "")]
        keywords: String,

        /// Print the result as JSON instead of a card
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive chat
    Chat {
        /// First message to send before reading stdin
        #[arg(long)]
        initial: Option<String>,
    },

    /// Inspect or clear the query history
    #[command(subcommand)]
    History(HistoryCommands),
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List entries, newest first
    List,

    /// Remove every entry
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show one entry in full
    Replay {
        /// Entry id as shown by `history list`
        id: String,

        /// For a conversation entry, start a new chat with its query
        #[arg(long)]
        chat: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "{} starting...", APP_NAME);

    match cli.command {
        Commands::Analyze {
            question,
            source,
            bias,
            keywords,
            json,
        } => {
            let query = Query::new(question)
                .with_source(source)
                .with_bias(bias)
                .with_keywords(keywords);
            run_analyze(&init_state(config).await?, query, json).await
        }
        Commands::Chat { initial } => run_chat(&init_state(config).await?, initial).await,
        // history commands only touch the ledger and need no API key
        Commands::History(command) => {
            let ledger = HistoryLedger::from_config(&config).await?;
            run_history(&config, &ledger, command).await
        }
    }
}

async fn init_state(config: Config) -> anyhow::Result<AppState> {
    match AppState::from_config(config).await {
        Ok(s) => Ok(s),
        Err(e) => {
            error!(error = %e, "Failed to initialize application state");
            Err(e.into())
        }
    }
}

async fn run_analyze(state: &AppState, query: Query, json: bool) -> anyhow::Result<()> {
    let session = state.analysis_session();

    match session.submit(&query).await {
        Ok(FlightOutcome::Completed(result)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", presentation::render_analysis(&result));
            }
            Ok(())
        }
        Ok(FlightOutcome::Dropped) => {
            warn!("Analysis already in progress");
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn run_chat(state: &AppState, initial: Option<String>) -> anyhow::Result<()> {
    let session = state.chat_session();
    let mut stdout = tokio::io::stdout();

    println!("{APP_NAME}. Ask about any future or past event; type `exit` to quit.");
    println!("Try:");
    for example in EXAMPLE_QUESTIONS {
        println!("  - {example}");
    }
    println!();

    if let Some(text) = initial {
        send_and_print(&session, &text).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text, "exit" | "quit") {
            break;
        }
        send_and_print(&session, text).await?;
    }

    println!("\n{DISCLAIMER_TEXT}");
    Ok(())
}

async fn send_and_print(
    session: &probability_compass::ChatSession,
    text: &str,
) -> anyhow::Result<()> {
    match session.send(text).await? {
        ChatOutcome::Answered(turn) => println!("\n{}\n", presentation::render_turn(&turn)),
        ChatOutcome::Failed { notice, .. } => println!("\n{}\n", presentation::render_turn(&notice)),
        ChatOutcome::Dropped => warn!("Message already in flight, ignoring input"),
    }
    Ok(())
}

async fn run_history(
    config: &Config,
    ledger: &HistoryLedger,
    command: HistoryCommands,
) -> anyhow::Result<()> {
    match command {
        HistoryCommands::List => {
            let entries = ledger.list().await?;
            println!("{}", presentation::render_history(&entries));
        }
        HistoryCommands::Clear { yes } => {
            if !yes && !confirm("Clear all history? This cannot be undone. [y/N] ").await? {
                println!("History kept.");
                return Ok(());
            }
            ledger.clear().await?;
            println!("History cleared.");
        }
        HistoryCommands::Replay { id, chat } => match ledger.find(&id).await? {
            Some(HistoryEntry::Conversation(record)) if chat => {
                let state = init_state(config.clone()).await?;
                return run_chat(&state, Some(record.query)).await;
            }
            Some(entry) => println!("{}", presentation::render_entry(&entry)),
            None => {
                eprintln!("No history entry with id {id}");
                std::process::exit(1);
            }
        },
    }
    Ok(())
}

async fn confirm(prompt: &str) -> anyhow::Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let answer = BufReader::new(tokio::io::stdin())
        .lines()
        .next_line()
        .await?
        .unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
