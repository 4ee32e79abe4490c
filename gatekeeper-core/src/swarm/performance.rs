//! Per-agent reliability records, updated by EMA on feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use super::agents::AgentType;

/// Reliability estimate for one agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformanceRecord {
    pub agent_type: AgentType,
    pub success_rate: f64,
    /// Seconds.
    pub avg_response_time: f64,
    pub user_satisfaction: f64,
    pub confidence_accuracy: f64,
    pub learning_rate: f64,
    pub feedback_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl AgentPerformanceRecord {
    /// A record with neutral priors.
    pub fn new(agent_type: AgentType, learning_rate: f64) -> Self {
        Self {
            agent_type,
            success_rate: 0.5,
            avg_response_time: 1.0,
            user_satisfaction: 0.5,
            confidence_accuracy: 0.5,
            learning_rate,
            feedback_count: 0,
            last_updated: Utc::now(),
        }
    }

    pub fn apply(&mut self, sample: &AgentFeedbackSample) {
        let lr = self.learning_rate;
        let ema = |old: f64, new: f64| (1.0 - lr) * old + lr * new;

        let success = if sample.success { 1.0 } else { 0.0 };
        self.success_rate = ema(self.success_rate, success).clamp(0.0, 1.0);
        self.user_satisfaction =
            ema(self.user_satisfaction, sample.satisfaction.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        if let Some(accuracy) = sample.confidence_accuracy {
            self.confidence_accuracy =
                ema(self.confidence_accuracy, accuracy.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        }
        if let Some(seconds) = sample.response_time_secs.filter(|s| s.is_finite() && *s >= 0.0) {
            self.avg_response_time = ema(self.avg_response_time, seconds);
        }
        self.feedback_count += 1;
        self.last_updated = Utc::now();
    }
}

/// One feedback observation for an agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentFeedbackSample {
    pub success: bool,
    pub satisfaction: f64,
    pub confidence_accuracy: Option<f64>,
    pub response_time_secs: Option<f64>,
}

/// Weight used for an agent without a record.
pub const DEFAULT_AGENT_WEIGHT: f64 = 0.5;

/// Shared table of agent records. Records appear on first feedback.
pub struct AgentPerformanceTable {
    records: RwLock<HashMap<AgentType, AgentPerformanceRecord>>,
    learning_rate: f64,
}

impl AgentPerformanceTable {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            learning_rate,
        }
    }

    /// Consistent weight snapshot for `agents`, read under one guard.
    pub async fn weights(&self, agents: &[AgentType]) -> HashMap<AgentType, f64> {
        let records = self.records.read().await;
        agents
            .iter()
            .map(|agent| {
                let weight = records
                    .get(agent)
                    .map(|r| r.success_rate)
                    .unwrap_or(DEFAULT_AGENT_WEIGHT);
                (*agent, weight)
            })
            .collect()
    }

    /// Snapshot of an agent's record; neutral priors when none exists yet.
    pub async fn get(&self, agent: AgentType) -> AgentPerformanceRecord {
        self.records
            .read()
            .await
            .get(&agent)
            .cloned()
            .unwrap_or_else(|| AgentPerformanceRecord::new(agent, self.learning_rate))
    }

    pub async fn contains(&self, agent: AgentType) -> bool {
        self.records.read().await.contains_key(&agent)
    }

    /// Apply one sample under the write guard and return the new record.
    pub async fn update(
        &self,
        agent: AgentType,
        sample: &AgentFeedbackSample,
    ) -> AgentPerformanceRecord {
        let mut records = self.records.write().await;
        let record = records
            .entry(agent)
            .or_insert_with(|| AgentPerformanceRecord::new(agent, self.learning_rate));
        record.apply(sample);

        info!(
            agent = %agent,
            success_rate = record.success_rate,
            satisfaction = record.user_satisfaction,
            feedback_count = record.feedback_count,
            "Updated agent performance"
        );
        record.clone()
    }

    /// Install persisted records. Rates are clamped to [0, 1] and the
    /// configured learning rate replaces the stored one.
    pub async fn restore(&self, restored: impl IntoIterator<Item = AgentPerformanceRecord>) {
        let mut records = self.records.write().await;
        for mut record in restored {
            let unit = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 };
            record.success_rate = unit(record.success_rate);
            record.user_satisfaction = unit(record.user_satisfaction);
            record.confidence_accuracy = unit(record.confidence_accuracy);
            if !(record.avg_response_time.is_finite() && record.avg_response_time >= 0.0) {
                record.avg_response_time = 1.0;
            }
            record.learning_rate = self.learning_rate;
            records.insert(record.agent_type, record);
        }
    }

    /// All records, ordered by agent type.
    pub async fn all(&self) -> Vec<AgentPerformanceRecord> {
        let mut all: Vec<_> = self.records.read().await.values().cloned().collect();
        all.sort_by_key(|r| r.agent_type);
        all
    }
}
