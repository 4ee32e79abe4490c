//! JSON-file [`PersistenceStore`].
//!
//! The whole [`StoreSnapshot`] is rewritten on every save: serialized to a
//! sibling temp file, then renamed over the target so a crash never leaves
//! a half-written snapshot.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use gatekeeper_core::confidence::SCORED_HISTORY_CAPACITY;
use gatekeeper_core::feedback::{DecisionRecord, FeedbackRecord};
use gatekeeper_core::persistence::{HistoryEntry, StoreResult};
use gatekeeper_core::{
    AgentPerformanceRecord, PersistenceStore, PredictionModel, StoreError, StoreSnapshot,
};

pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<StoreSnapshot>,
    max_decisions: usize,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Deserialization(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreSnapshot::default(),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        info!(
            path = %path.display(),
            decisions = state.decisions.len(),
            has_model = state.model.is_some(),
            "Opened snapshot store"
        );
        Ok(Self {
            path,
            state: RwLock::new(state),
            max_decisions: SCORED_HISTORY_CAPACITY,
        })
    }

    /// Keep at most `max` decisions (and their feedback) on disk.
    pub fn with_max_decisions(mut self, max: usize) -> Self {
        self.max_decisions = max.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` and write the result while still holding the guard,
    /// so concurrent saves land on disk in order.
    async fn update<F>(&self, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut StoreSnapshot),
    {
        let mut state = self.state.write().await;
        change(&mut state);
        state.prune(self.max_decisions);

        let json = serde_json::to_vec_pretty(&*state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        debug!(path = %self.path.display(), "Snapshot written");
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn save_decision(&self, record: &DecisionRecord) -> StoreResult<()> {
        self.update(|s| s.insert_decision(record)).await
    }

    async fn load_recent_history(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self.state.read().await.history(limit))
    }

    async fn save_feedback(&self, feedback: &FeedbackRecord) -> StoreResult<()> {
        self.update(|s| s.insert_feedback(feedback)).await
    }

    async fn load_agent_performance(&self) -> StoreResult<Vec<AgentPerformanceRecord>> {
        Ok(self.state.read().await.agents.values().cloned().collect())
    }

    async fn save_agent_performance(&self, records: &[AgentPerformanceRecord]) -> StoreResult<()> {
        self.update(|s| s.insert_agents(records)).await
    }

    async fn load_prediction_model(&self) -> StoreResult<Option<PredictionModel>> {
        Ok(self.state.read().await.model.clone())
    }

    async fn save_prediction_model(&self, model: &PredictionModel) -> StoreResult<()> {
        self.update(|s| s.model = Some(model.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_core::{AgentType, ConfidenceFactors, ResolutionOutcome, ResolutionPath};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn decision(text: &str) -> DecisionRecord {
        DecisionRecord::new(
            Uuid::new_v4(),
            text,
            ConfidenceFactors::new(),
            0.4,
            ResolutionPath::Escalation,
        )
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let record = decision("vpn keeps dropping");
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.save_decision(&record).await.unwrap();
            store
                .save_feedback(&FeedbackRecord::new(
                    record.decision_id,
                    ResolutionOutcome::Resolved,
                    0.8,
                ))
                .await
                .unwrap();
            store
                .save_agent_performance(&[AgentPerformanceRecord::new(AgentType::Triage, 0.1)])
                .await
                .unwrap();
            store
                .save_prediction_model(&PredictionModel::new(BTreeMap::new(), 0.05))
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let history = reopened.load_recent_history(10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].decision.decision_id, record.decision_id);
        assert_eq!(history[0].decision.request_hash, record.request_hash);
        assert!(history[0].feedback.is_some());
        assert_eq!(reopened.load_agent_performance().await.unwrap().len(), 1);
        assert_eq!(
            reopened.load_prediction_model().await.unwrap().map(|m| m.bias),
            Some(0.05)
        );
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("new.json")).await.unwrap();
        assert!(store.load_recent_history(5).await.unwrap().is_empty());
        assert!(store.load_prediction_model().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StoreError::Deserialization(_))
        ));
    }

    #[tokio::test]
    async fn test_oldest_decisions_are_pruned_with_their_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("state.json"))
            .await
            .unwrap()
            .with_max_decisions(2);

        let first = decision("one");
        store.save_decision(&first).await.unwrap();
        store
            .save_feedback(&FeedbackRecord::new(
                first.decision_id,
                ResolutionOutcome::NotResolved,
                0.1,
            ))
            .await
            .unwrap();
        store.save_decision(&decision("two")).await.unwrap();
        store.save_decision(&decision("three")).await.unwrap();

        let history = store.load_recent_history(10).await.unwrap();
        let texts: Vec<_> = history.iter().map(|h| h.decision.request_text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
        assert!(history.iter().all(|h| h.feedback.is_none()));
    }
}
