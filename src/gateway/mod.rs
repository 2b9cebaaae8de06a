//! Model gateway.
//!
//! Owns the one external call contract: shapes the request (system
//! instruction, low temperature, web search always on, bounded history),
//! extracts the answer text and grounding citations, and translates every
//! provider error into [`AnalysisError::Failure`]. A failed call is never
//! retried.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::analysis::AnalysisResult;
use crate::config::{DEFAULT_MAX_TURNS, DEFAULT_TEMPERATURE};
use crate::conversation::{ConversationTurn, Role, Source};
use crate::error::{AnalysisError, AnalysisResultOf, ProviderError, ProviderResult};
use crate::normalize;
use crate::prompts::{system_instruction, ResponseContract, NO_ANSWER_TEXT};
use crate::query::InstructionBundle;

/// Message surfaced for every provider failure.
pub const FAILURE_MESSAGE: &str = "Failed to analyze probability. Please try again.";

/// Role of a forwarded turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

/// A turn as sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTurn {
    pub role: TurnRole,
    pub text: String,
}

/// Provider-agnostic request.
///
/// Search grounding has no switch: every request carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system_instruction: String,
    pub temperature: f32,
    pub turns: Vec<ModelTurn>,
}

impl ModelRequest {
    /// Always true.
    pub fn search_enabled(&self) -> bool {
        true
    }
}

/// A citation as reported by the provider, possibly incomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCitation {
    pub title: Option<String>,
    pub uri: Option<String>,
}

/// Provider answer before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderReply {
    pub text: Option<String>,
    pub citations: Vec<RawCitation>,
}

/// Gateway answer: text plus deduplicated sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    pub sources: Vec<Source>,
}

/// The external model behind the gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Issue exactly one request.
    async fn generate(&self, request: ModelRequest) -> ProviderResult<ProviderReply>;
}

/// Gateway over a [`ModelProvider`]. Cheap to clone; holds no state of its own.
#[derive(Clone)]
pub struct Gateway {
    provider: Arc<dyn ModelProvider>,
    temperature: f32,
}

impl Gateway {
    /// Create a gateway with the default temperature.
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Override the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Conversational mode: answer `query` given the recent transcript.
    ///
    /// Only the last `max_turns` turns of `history` are forwarded,
    /// oldest first; the query follows as the final user turn.
    pub async fn converse(
        &self,
        query: &str,
        history: &[ConversationTurn],
        max_turns: usize,
    ) -> AnalysisResultOf<ModelReply> {
        let mut turns = history_window(history, max_turns);
        turns.push(ModelTurn {
            role: TurnRole::User,
            text: query.to_string(),
        });

        let request = ModelRequest {
            system_instruction: system_instruction(ResponseContract::Conversational, today()),
            temperature: self.temperature,
            turns,
        };

        self.call(request).await
    }

    /// Conversational mode with the default six-turn window.
    pub async fn converse_default(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> AnalysisResultOf<ModelReply> {
        self.converse(query, history, DEFAULT_MAX_TURNS).await
    }

    /// Structured mode: one request, parsed into an [`AnalysisResult`].
    pub async fn analyze(&self, bundle: &InstructionBundle) -> AnalysisResultOf<AnalysisResult> {
        let request = ModelRequest {
            system_instruction: system_instruction(ResponseContract::Structured, today()),
            temperature: self.temperature,
            turns: vec![ModelTurn {
                role: TurnRole::User,
                text: bundle.to_prompt(),
            }],
        };

        let reply = self.call(request).await?;
        debug!(
            grounding_sources = reply.sources.len(),
            "Parsing structured analysis"
        );
        normalize::parse_analysis(&reply.text)
    }

    async fn call(&self, request: ModelRequest) -> AnalysisResultOf<ModelReply> {
        let start = Instant::now();
        debug!(
            turns = request.turns.len(),
            temperature = request.temperature,
            search = request.search_enabled(),
            "Calling model provider"
        );

        let reply = self
            .provider
            .generate(request)
            .await
            .map_err(translate_error)?;

        let sources = collect_sources(reply.citations);
        let text = reply
            .text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| NO_ANSWER_TEXT.to_string());

        info!(
            latency_ms = start.elapsed().as_millis() as u64,
            sources = sources.len(),
            "Model call succeeded"
        );

        Ok(ModelReply { text, sources })
    }
}

/// Log a provider error and fold it into the opaque failure.
fn translate_error(err: ProviderError) -> AnalysisError {
    error!(error = %err, "Model provider call failed");
    AnalysisError::Failure {
        message: FAILURE_MESSAGE.to_string(),
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The last `max_turns` turns of the transcript, oldest first. Only user
/// turns go out as `user`; model answers and local notices go out as `model`.
pub fn history_window(history: &[ConversationTurn], max_turns: usize) -> Vec<ModelTurn> {
    let skip = history.len().saturating_sub(max_turns);

    history[skip..]
        .iter()
        .map(|t| ModelTurn {
            role: match t.role {
                Role::User => TurnRole::User,
                Role::Model | Role::System => TurnRole::Model,
            },
            text: t.content.clone(),
        })
        .collect()
}

/// Keep citations with both a title and a URL, deduplicated by URL. The first
/// title seen for a URL wins and first-appearance order is kept.
pub fn collect_sources(citations: Vec<RawCitation>) -> Vec<Source> {
    let mut seen = HashSet::new();
    citations
        .into_iter()
        .filter_map(|c| match (c.title, c.uri) {
            (Some(title), Some(uri)) if !title.is_empty() && !uri.is_empty() => {
                Some(Source { title, uri })
            }
            _ => None,
        })
        .filter(|s| seen.insert(s.uri.clone()))
        .collect()
}
