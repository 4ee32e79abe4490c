use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::record::{DecisionRecord, FeedbackRecord};
use crate::confidence::{ConfidenceScorer, WeightChange};
use crate::persistence::{PersistenceStore, StoreResult};
use crate::swarm::{AgentFeedbackSample, AgentPerformanceRecord, AgentPerformanceTable};
use crate::triage::{Category, TriageClassifier};

/// What one feedback event changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningReport {
    pub decision_id: Uuid,
    pub actual_outcome: f64,
    /// `1 - |predicted - actual|` for this decision.
    pub accuracy: f64,
    pub weight_changes: Vec<WeightChange>,
    /// Updated records of the agents that contributed to the decision.
    pub agent_updates: Vec<AgentPerformanceRecord>,
    pub triage_category: Option<Category>,
    /// False when the scored decision had already left the scorer history.
    pub history_matched: bool,
}

/// Routes feedback into every learning component, then persists the
/// learned state.
pub struct LearningFeedbackLoop {
    scorer: Arc<ConfidenceScorer>,
    performance: Arc<AgentPerformanceTable>,
    triage: Arc<TriageClassifier>,
    store: Arc<dyn PersistenceStore>,
}

impl LearningFeedbackLoop {
    pub fn new(
        scorer: Arc<ConfidenceScorer>,
        performance: Arc<AgentPerformanceTable>,
        triage: Arc<TriageClassifier>,
        store: Arc<dyn PersistenceStore>,
    ) -> Self {
        Self {
            scorer,
            performance,
            triage,
            store,
        }
    }

    /// Apply one feedback event for `decision`.
    ///
    /// In-memory learning always completes before persistence is attempted,
    /// so a store error leaves the running engine updated but not saved.
    pub async fn apply_feedback(
        &self,
        decision: &DecisionRecord,
        feedback: &FeedbackRecord,
    ) -> StoreResult<LearningReport> {
        let actual = feedback.actual_outcome();
        let success = feedback.outcome.is_success();

        let history_matched = self
            .scorer
            .record_outcome(decision.decision_id, actual)
            .await;
        let update = self
            .scorer
            .update_model(&decision.factors, decision.predicted_confidence, actual)
            .await;

        let mut agent_updates = Vec::new();
        for participation in decision.agents.iter().filter(|p| p.success) {
            let sample = AgentFeedbackSample {
                success,
                satisfaction: feedback.satisfaction,
                confidence_accuracy: feedback.confidence_accuracy,
                response_time_secs: Some(participation.response_time_ms as f64 / 1000.0),
            };
            agent_updates.push(self.performance.update(participation.agent, &sample).await);
        }

        if let Some(category) = decision.triage_category {
            self.triage.record_outcome(category, success).await;
        }

        debug!(
            decision_id = %decision.decision_id,
            "Persisting learned state"
        );
        self.store.save_feedback(feedback).await?;
        self.store
            .save_prediction_model(&self.scorer.model().await)
            .await?;
        if !agent_updates.is_empty() {
            self.store.save_agent_performance(&agent_updates).await?;
        }

        info!(
            decision_id = %decision.decision_id,
            outcome = %feedback.outcome,
            actual,
            accuracy = update.accuracy,
            weight_changes = update.weight_changes.len(),
            agents = agent_updates.len(),
            "Feedback applied"
        );

        Ok(LearningReport {
            decision_id: decision.decision_id,
            actual_outcome: actual,
            accuracy: update.accuracy,
            weight_changes: update.weight_changes,
            agent_updates,
            triage_category: decision.triage_category,
            history_matched,
        })
    }
}
