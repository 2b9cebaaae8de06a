//! # Probability Compass
//!
//! Decision-support engine that asks a hosted language model (Google Gemini,
//! with web-search grounding) for a calibrated probability estimate of a
//! future event, or verification of a past one.
//!
//! ## Features
//!
//! - **Structured analysis**: probability range, scenarios, signals and sources
//!   parsed from a fixed JSON contract; malformed output fails closed
//! - **Conversational mode**: Markdown chat with a bounded history window and
//!   deduplicated citations
//! - **Prompt shaping**: source preference, confidence bias and keyword focus
//! - **Single-flight guard**: overlapping triggers are dropped, never queued
//! - **History ledger**: newest-first, append-only, in memory or SQLite
//!
//! ## Architecture
//!
//! ```text
//! Query → Prompt Builder → Gateway → Gemini (HTTP)
//!                             ↓
//!                        Normalizer → Presentation
//!                             ↓
//!                     History Ledger (SQLite)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use probability_compass::{AppState, Config, Query};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = AppState::from_config(config).await?;
//!     let session = state.analysis_session();
//!     let outcome = session.submit(&Query::new("Will it rain in Paris tomorrow?")).await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

/// Analysis result records and their derived display fields.
pub mod analysis;
/// Configuration management.
pub mod config;
/// Conversation turns and transcripts.
pub mod conversation;
/// Error types and result aliases for the application.
pub mod error;
/// Model gateway: request shaping, citation handling, error translation.
pub mod gateway;
/// Gemini API client and wire types.
pub mod gemini;
/// Single-flight request guard.
pub mod guard;
/// History ledger and its stores.
pub mod history;
/// Shaping of raw model output into result types.
pub mod normalize;
/// Plain-text rendering for the CLI.
pub mod presentation;
/// System prompts and fixed user-facing text.
pub mod prompts;
/// Query options and the prompt builder.
pub mod query;
/// Analysis and chat sessions.
pub mod session;

pub use config::Config;
pub use error::{AnalysisError, AppError, AppResult};
pub use query::{ConfidenceBias, Query, SourcePreference};
pub use session::{AnalysisSession, AppState, ChatOutcome, ChatSession};
