//! History ledger.
//!
//! Append-only, newest-first list of completed queries and analyses. The
//! ledger only needs "read all, append one, clear all" from its store, so the
//! same contract is served by an in-memory vector or a SQLite table.

mod sqlite;

pub use sqlite::SqliteHistoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::config::{Config, HistoryBackend};
use crate::conversation::ConversationTurn;
use crate::error::StorageResult;

/// Characters of the answer kept in a conversation summary.
pub const SUMMARY_CHARS: usize = 100;

/// A completed chat exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub query: String,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
}

impl ConversationRecord {
    /// Record an exchange; the summary is the head of `answer` plus `...`.
    pub fn new(query: impl Into<String>, answer: &str, turns: Vec<ConversationTurn>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            summary: summarize(answer),
            timestamp: Utc::now(),
            turns,
        }
    }
}

/// Head of `text` followed by an ellipsis.
pub fn summarize(text: &str) -> String {
    let mut summary: String = text.chars().take(SUMMARY_CHARS).collect();
    summary.push_str("...");
    summary
}

/// One ledger entry. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entry", rename_all = "snake_case")]
pub enum HistoryEntry {
    Conversation(ConversationRecord),
    Analysis(AnalysisResult),
}

impl HistoryEntry {
    pub fn id(&self) -> &str {
        match self {
            HistoryEntry::Conversation(c) => &c.id,
            HistoryEntry::Analysis(a) => &a.id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            HistoryEntry::Conversation(c) => c.timestamp,
            HistoryEntry::Analysis(a) => a.timestamp,
        }
    }

    /// Entry kind as stored.
    pub fn kind(&self) -> &'static str {
        match self {
            HistoryEntry::Conversation(_) => "conversation",
            HistoryEntry::Analysis(_) => "analysis",
        }
    }
}

/// Persistence medium behind the ledger.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All entries, newest first.
    async fn read_all(&self) -> StorageResult<Vec<HistoryEntry>>;
    /// Persist one entry as the newest.
    async fn write(&self, entry: &HistoryEntry) -> StorageResult<()>;
    /// Remove every entry.
    async fn clear(&self) -> StorageResult<()>;
}

/// Session-only store.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn read_all(&self) -> StorageResult<Vec<HistoryEntry>> {
        Ok(self.entries.read().await.clone())
    }

    async fn write(&self, entry: &HistoryEntry) -> StorageResult<()> {
        self.entries.write().await.insert(0, entry.clone());
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// The ledger. Exclusively owns the history list through its store.
#[derive(Clone)]
pub struct HistoryLedger {
    store: Arc<dyn HistoryStore>,
}

impl HistoryLedger {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Ledger over the store selected by `HISTORY_BACKEND`.
    pub async fn from_config(config: &Config) -> StorageResult<Self> {
        let store: Arc<dyn HistoryStore> = match config.history.backend {
            HistoryBackend::Sqlite => Arc::new(SqliteHistoryStore::new(&config.database).await?),
            HistoryBackend::Memory => Arc::new(MemoryHistoryStore::new()),
        };
        Ok(Self::new(store))
    }

    /// Ledger over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryHistoryStore::new()))
    }

    /// Insert at the front.
    pub async fn append(&self, entry: HistoryEntry) -> StorageResult<()> {
        self.store.write(&entry).await?;
        info!(entry_id = %entry.id(), kind = entry.kind(), "History entry appended");
        Ok(())
    }

    /// Entries, most recent first.
    pub async fn list(&self) -> StorageResult<Vec<HistoryEntry>> {
        self.store.read_all().await
    }

    /// Remove all entries. Callers confirm with the user first.
    pub async fn clear(&self) -> StorageResult<()> {
        self.store.clear().await?;
        info!("History cleared");
        Ok(())
    }

    /// Look up an entry for replay.
    pub async fn find(&self, id: &str) -> StorageResult<Option<HistoryEntry>> {
        Ok(self.list().await?.into_iter().find(|e| e.id() == id))
    }
}
