//! Persistence boundary for decisions, feedback and learned state.
//!
//! The engine never talks to a database directly. Everything it needs to
//! survive a restart goes through [`PersistenceStore`]:
//!
//! | Record                   | Written on            | Read on   |
//! |--------------------------|-----------------------|-----------|
//! | [`DecisionRecord`]       | every evaluation      | restore   |
//! | [`FeedbackRecord`]       | every feedback event  | restore   |
//! | [`AgentPerformanceRecord`] | every feedback event | restore  |
//! | [`PredictionModel`]      | every feedback event  | restore   |
//!
//! [`MemoryStore`] is the in-process implementation used by tests and by
//! callers that do not need durability. [`StoreSnapshot`] is the
//! serializable state both it and file-backed stores are built on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::confidence::{PredictionModel, SCORED_HISTORY_CAPACITY};
use crate::feedback::{DecisionRecord, FeedbackRecord};
use crate::swarm::{AgentPerformanceRecord, AgentType};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored decision together with its most recent feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub decision: DecisionRecord,
    pub feedback: Option<FeedbackRecord>,
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn save_decision(&self, record: &DecisionRecord) -> StoreResult<()>;

    /// Up to `limit` most recent decisions, oldest first.
    async fn load_recent_history(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>>;

    async fn save_feedback(&self, feedback: &FeedbackRecord) -> StoreResult<()>;

    async fn load_agent_performance(&self) -> StoreResult<Vec<AgentPerformanceRecord>>;

    async fn save_agent_performance(&self, records: &[AgentPerformanceRecord]) -> StoreResult<()>;

    async fn load_prediction_model(&self) -> StoreResult<Option<PredictionModel>>;

    async fn save_prediction_model(&self, model: &PredictionModel) -> StoreResult<()>;
}

/// Complete persisted state. Decisions keep insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub decisions: Vec<DecisionRecord>,
    #[serde(default)]
    pub feedback: HashMap<Uuid, FeedbackRecord>,
    #[serde(default)]
    pub agents: BTreeMap<AgentType, AgentPerformanceRecord>,
    #[serde(default)]
    pub model: Option<PredictionModel>,
}

impl StoreSnapshot {
    /// Replaces an existing record with the same id in place.
    pub fn insert_decision(&mut self, record: &DecisionRecord) {
        match self
            .decisions
            .iter()
            .rposition(|d| d.decision_id == record.decision_id)
        {
            Some(pos) => self.decisions[pos] = record.clone(),
            None => self.decisions.push(record.clone()),
        }
    }

    /// Drop the oldest decisions, and their feedback, beyond `max`.
    pub fn prune(&mut self, max: usize) {
        let excess = self.decisions.len().saturating_sub(max);
        for dropped in self.decisions.drain(..excess) {
            self.feedback.remove(&dropped.decision_id);
        }
    }

    pub fn insert_feedback(&mut self, feedback: &FeedbackRecord) {
        self.feedback.insert(feedback.decision_id, feedback.clone());
    }

    pub fn insert_agents(&mut self, records: &[AgentPerformanceRecord]) {
        for record in records {
            self.agents.insert(record.agent_type, record.clone());
        }
    }

    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        let skip = self.decisions.len().saturating_sub(limit);
        self.decisions
            .iter()
            .skip(skip)
            .map(|decision| HistoryEntry {
                decision: decision.clone(),
                feedback: self.feedback.get(&decision.decision_id).cloned(),
            })
            .collect()
    }
}

/// In-memory [`PersistenceStore`], capped at the same number of decisions
/// the scorer keeps.
pub struct MemoryStore {
    state: RwLock<StoreSnapshot>,
    max_decisions: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from_snapshot(StoreSnapshot::default())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            max_decisions: SCORED_HISTORY_CAPACITY,
        }
    }

    pub fn with_max_decisions(mut self, max: usize) -> Self {
        self.max_decisions = max.max(1);
        self
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn save_decision(&self, record: &DecisionRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.insert_decision(record);
        state.prune(self.max_decisions);
        Ok(())
    }

    async fn load_recent_history(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self.state.read().await.history(limit))
    }

    async fn save_feedback(&self, feedback: &FeedbackRecord) -> StoreResult<()> {
        self.state.write().await.insert_feedback(feedback);
        Ok(())
    }

    async fn load_agent_performance(&self) -> StoreResult<Vec<AgentPerformanceRecord>> {
        Ok(self.state.read().await.agents.values().cloned().collect())
    }

    async fn save_agent_performance(&self, records: &[AgentPerformanceRecord]) -> StoreResult<()> {
        self.state.write().await.insert_agents(records);
        Ok(())
    }

    async fn load_prediction_model(&self) -> StoreResult<Option<PredictionModel>> {
        Ok(self.state.read().await.model.clone())
    }

    async fn save_prediction_model(&self, model: &PredictionModel) -> StoreResult<()> {
        self.state.write().await.model = Some(model.clone());
        Ok(())
    }
}
