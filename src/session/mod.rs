//! Sessions tie the pipeline together.
//!
//! [`AnalysisSession`] drives structured mode (one query in, one
//! [`AnalysisResult`] out) and [`ChatSession`] drives conversational mode (a
//! growing transcript). Both share one [`Gateway`] and one [`HistoryLedger`];
//! each session owns its own [`SingleFlight`] guard, so overlapping triggers
//! on one session are dropped while separate sessions run independently.
//! History is appended only after a fully successful, normalized result.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::analysis::AnalysisResult;
use crate::config::{Config, DEFAULT_MAX_TURNS};
use crate::conversation::{Conversation, ConversationTurn};
use crate::error::{AnalysisError, AppError, AppResult};
use crate::gateway::Gateway;
use crate::gemini::GeminiClient;
use crate::guard::{FlightOutcome, FlightState, SingleFlight};
use crate::history::{ConversationRecord, HistoryEntry, HistoryLedger};
use crate::normalize::{model_turn, system_turn, user_turn};
use crate::prompts::CHAT_FAILURE_NOTICE;
use crate::query::Query;

/// Reject blank input before any request is issued.
pub fn validate_question(question: &str) -> Result<(), AnalysisError> {
    if question.trim().is_empty() {
        return Err(AnalysisError::validation("question", "Question cannot be empty"));
    }
    Ok(())
}

/// Shared application state: configuration plus the collaborators every
/// session needs.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: Gateway,
    pub ledger: HistoryLedger,
}

impl AppState {
    pub fn new(config: Config, gateway: Gateway, ledger: HistoryLedger) -> Self {
        Self {
            config,
            gateway,
            ledger,
        }
    }

    /// Build the Gemini-backed gateway and the configured history store.
    pub async fn from_config(config: Config) -> AppResult<Self> {
        let client = GeminiClient::new(&config.gemini, config.request.clone()).map_err(|e| {
            AppError::Config {
                message: format!("Failed to initialize Gemini client: {}", e),
            }
        })?;
        let gateway = Gateway::new(Arc::new(client)).with_temperature(config.gemini.temperature);

        let ledger = HistoryLedger::from_config(&config).await?;

        info!(
            model = %config.gemini.model,
            backend = ?config.history.backend,
            "Application state initialized"
        );

        Ok(Self::new(config, gateway, ledger))
    }

    pub fn analysis_session(&self) -> AnalysisSession {
        AnalysisSession::new(self.gateway.clone(), self.ledger.clone())
    }

    pub fn chat_session(&self) -> ChatSession {
        ChatSession::new(self.gateway.clone(), self.ledger.clone())
            .with_max_turns(self.config.chat.max_turns)
    }
}

/// Structured-mode session.
pub struct AnalysisSession {
    gateway: Gateway,
    ledger: HistoryLedger,
    guard: SingleFlight,
}

impl AnalysisSession {
    pub fn new(gateway: Gateway, ledger: HistoryLedger) -> Self {
        Self {
            gateway,
            ledger,
            guard: SingleFlight::new(),
        }
    }

    pub fn state(&self) -> FlightState {
        self.guard.state()
    }

    /// Validate, analyze and record one query.
    ///
    /// Returns [`FlightOutcome::Dropped`] if another submission on this
    /// session is still in flight.
    pub async fn submit(&self, query: &Query) -> AppResult<FlightOutcome<AnalysisResult>> {
        validate_question(&query.question)?;

        match self.guard.run(self.execute(query)).await {
            FlightOutcome::Completed(result) => result.map(FlightOutcome::Completed),
            FlightOutcome::Dropped => Ok(FlightOutcome::Dropped),
        }
    }

    async fn execute(&self, query: &Query) -> AppResult<AnalysisResult> {
        debug!(
            source = %query.source_preference,
            bias = %query.confidence_bias,
            has_keywords = !query.keywords.trim().is_empty(),
            "Submitting analysis"
        );

        let bundle = query.instructions();
        let result = self.gateway.analyze(&bundle).await?;
        self.ledger
            .append(HistoryEntry::Analysis(result.clone()))
            .await?;

        info!(
            analysis_id = %result.id,
            status = %result.report.status,
            "Analysis completed"
        );
        Ok(result)
    }
}

/// What happened to one chat message.
#[derive(Debug)]
pub enum ChatOutcome {
    /// The model answered; the turn has been appended to the transcript.
    Answered(ConversationTurn),
    /// The call failed; a system notice has been appended instead.
    Failed {
        error: AnalysisError,
        notice: ConversationTurn,
    },
    /// A previous message is still in flight; nothing was sent.
    Dropped,
}

/// Conversational-mode session.
pub struct ChatSession {
    gateway: Gateway,
    ledger: HistoryLedger,
    guard: SingleFlight,
    conversation: Mutex<Conversation>,
    max_turns: usize,
}

impl ChatSession {
    pub fn new(gateway: Gateway, ledger: HistoryLedger) -> Self {
        Self {
            gateway,
            ledger,
            guard: SingleFlight::new(),
            conversation: Mutex::new(Conversation::new()),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Set the forwarded history window
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn state(&self) -> FlightState {
        self.guard.state()
    }

    /// Snapshot of the transcript.
    pub async fn conversation(&self) -> Conversation {
        self.conversation.lock().await.clone()
    }

    /// Send one message.
    pub async fn send(&self, text: &str) -> AppResult<ChatOutcome> {
        validate_question(text)?;

        match self.guard.run(self.exchange(text)).await {
            FlightOutcome::Completed(outcome) => outcome,
            FlightOutcome::Dropped => Ok(ChatOutcome::Dropped),
        }
    }

    async fn exchange(&self, text: &str) -> AppResult<ChatOutcome> {
        // the model sees the transcript as it stood before this message
        let prior = {
            let mut conversation = self.conversation.lock().await;
            let prior = conversation.turns().to_vec();
            conversation.push(user_turn(text));
            prior
        };

        match self.gateway.converse(text, &prior, self.max_turns).await {
            Ok(reply) => {
                let answer = reply.text.clone();
                let turn = model_turn(reply);
                let turns = {
                    let mut conversation = self.conversation.lock().await;
                    conversation.push(turn.clone());
                    conversation.turns().to_vec()
                };

                // the answer is already in the transcript; a ledger failure
                // only loses the history entry
                if let Err(e) = self
                    .ledger
                    .append(HistoryEntry::Conversation(ConversationRecord::new(
                        text, &answer, turns,
                    )))
                    .await
                {
                    warn!(error = %e, "Failed to record chat exchange in history");
                }

                Ok(ChatOutcome::Answered(turn))
            }
            Err(error) => {
                warn!(error = %error, "Chat message failed");
                let notice = system_turn(CHAT_FAILURE_NOTICE);
                self.conversation.lock().await.push(notice.clone());
                Ok(ChatOutcome::Failed { error, notice })
            }
        }
    }
}
