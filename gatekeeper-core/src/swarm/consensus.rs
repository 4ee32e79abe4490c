//! Weighted consensus over concurrently dispatched agents.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::agents::{AgentError, AgentType, AgentVerdict, Recommendation, ScoringAgent, SwarmTask};
use super::performance::{AgentPerformanceRecord, AgentPerformanceTable};
use crate::history::BoundedHistory;

/// Collective outcomes remembered for observability.
pub const COLLECTIVE_MEMORY_CAPACITY: usize = 1000;

/// One agent's contribution to a consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: AgentType,
    pub success: bool,
    pub confidence: f64,
    pub recommendation: Option<Recommendation>,
    /// Weight taken from the performance snapshot at dispatch.
    pub weight: f64,
    pub response_time_ms: u64,
    pub error: Option<String>,
    pub payload: serde_json::Value,
}

/// Aggregate of all agent results for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub agent_results: BTreeMap<AgentType, AgentResult>,
    pub confidence: f64,
    pub recommendation: Recommendation,
    /// Share of total weight behind the winning recommendation.
    pub consensus_strength: f64,
}

impl ConsensusResult {
    pub fn successful_agents(&self) -> impl Iterator<Item = &AgentResult> {
        self.agent_results.values().filter(|r| r.success)
    }

    pub fn agent_count(&self) -> usize {
        self.agent_results.len()
    }
}

/// Entry in the collective memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectiveOutcome {
    pub task_id: Uuid,
    pub confidence: f64,
    pub recommendation: Recommendation,
    /// Confidence exceeded the consensus threshold.
    pub success: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Observability snapshot of the swarm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwarmInsights {
    pub registered_agents: Vec<AgentType>,
    pub collective_memory_size: usize,
    /// Share of remembered tasks that reached the consensus threshold.
    pub collective_success_ratio: f64,
    pub consensus_threshold: f64,
    pub agent_performance: Vec<AgentPerformanceRecord>,
}

/// `(confidence, recommendation, strength)` from `(confidence, label, weight)`
/// triples of the agents that succeeded.
///
/// Confidence is `Σ(confidence·weight) / Σweight`, so (0.8, w 0.7) and
/// (0.6, w 0.5) give 0.7167; zero total weight falls back to the plain mean.
/// Equal label weights resolve to the more cautious label.
pub fn aggregate(verdicts: &[(f64, Recommendation, f64)]) -> (f64, Recommendation, f64) {
    if verdicts.is_empty() {
        return (0.0, Recommendation::InsufficientData, 0.0);
    }

    let total_weight: f64 = verdicts.iter().map(|(_, _, w)| w).sum();
    let confidence = if total_weight > 0.0 {
        verdicts.iter().map(|(c, _, w)| c * w).sum::<f64>() / total_weight
    } else {
        verdicts.iter().map(|(c, _, _)| c).sum::<f64>() / verdicts.len() as f64
    };

    let mut label_weights: HashMap<Recommendation, f64> = HashMap::new();
    for (_, label, weight) in verdicts {
        *label_weights.entry(*label).or_insert(0.0) += weight;
    }
    let (recommendation, winning_weight) = label_weights
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1).then(a.0.caution().cmp(&b.0.caution())))
        .unwrap_or((Recommendation::InsufficientData, 0.0));

    let strength = if total_weight > 0.0 {
        winning_weight / total_weight
    } else {
        // All weights zero: fall back to vote share.
        verdicts.iter().filter(|(_, l, _)| *l == recommendation).count() as f64
            / verdicts.len() as f64
    };

    (
        confidence.clamp(0.0, 1.0),
        recommendation,
        strength.clamp(0.0, 1.0),
    )
}

/// Runs tasks across the registered agents and aggregates their verdicts.
pub struct SwarmConsensus {
    agents: HashMap<AgentType, Arc<dyn ScoringAgent>>,
    performance: Arc<AgentPerformanceTable>,
    memory: RwLock<BoundedHistory<CollectiveOutcome>>,
    agent_timeout: Duration,
    consensus_threshold: f64,
}

impl SwarmConsensus {
    pub fn new(
        performance: Arc<AgentPerformanceTable>,
        agent_timeout: Duration,
        consensus_threshold: f64,
    ) -> Self {
        Self {
            agents: HashMap::new(),
            performance,
            memory: RwLock::new(BoundedHistory::new(COLLECTIVE_MEMORY_CAPACITY)),
            agent_timeout,
            consensus_threshold,
        }
    }

    /// Register an agent under its own type, replacing any previous one.
    pub fn with_agent(mut self, agent: Arc<dyn ScoringAgent>) -> Self {
        self.agents.insert(agent.agent_type(), agent);
        self
    }

    pub fn registered(&self) -> Vec<AgentType> {
        let mut registered: Vec<_> = self.agents.keys().copied().collect();
        registered.sort();
        registered
    }

    pub fn performance(&self) -> &Arc<AgentPerformanceTable> {
        &self.performance
    }

    /// Dispatch `task` to every agent in `agent_types` concurrently and
    /// aggregate the successful verdicts.
    pub async fn coordinate(
        &self,
        task: Arc<SwarmTask>,
        agent_types: &[AgentType],
    ) -> ConsensusResult {
        // Weights are read once; feedback landing mid-flight affects the next task.
        let weights = self.performance.weights(agent_types).await;

        let futures = agent_types.iter().map(|agent_type| {
            let task = Arc::clone(&task);
            let agent = self.agents.get(agent_type).cloned();
            let timeout = self.agent_timeout;
            let agent_type = *agent_type;
            async move {
                let started = Instant::now();
                let result = match agent {
                    None => Err(AgentError::NotRegistered(agent_type)),
                    Some(agent) => {
                        match tokio::time::timeout(timeout, agent.evaluate(&task)).await {
                            Ok(result) => result,
                            Err(_) => Err(AgentError::Timeout(timeout)),
                        }
                    }
                };
                (agent_type, result, started.elapsed())
            }
        });
        let outcomes: Vec<(AgentType, Result<AgentVerdict, AgentError>, Duration)> =
            join_all(futures).await;

        let mut agent_results = BTreeMap::new();
        let mut verdicts = Vec::new();
        for (agent, result, elapsed) in outcomes {
            let weight = weights
                .get(&agent)
                .copied()
                .unwrap_or(super::performance::DEFAULT_AGENT_WEIGHT);
            let response_time_ms = elapsed.as_millis().min(u128::from(u64::MAX)) as u64;

            let entry = match result {
                Ok(verdict) => {
                    let confidence = if verdict.confidence.is_finite() {
                        verdict.confidence.clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    verdicts.push((confidence, verdict.recommendation, weight));
                    debug!(
                        agent = %agent,
                        confidence,
                        recommendation = %verdict.recommendation,
                        weight,
                        "Agent verdict"
                    );
                    AgentResult {
                        agent,
                        success: true,
                        confidence,
                        recommendation: Some(verdict.recommendation),
                        weight,
                        response_time_ms,
                        error: None,
                        payload: verdict.payload,
                    }
                }
                Err(err) => {
                    warn!(
                        decision_id = %task.decision_id,
                        agent = %agent,
                        error = %err,
                        "Agent failed, excluded from consensus"
                    );
                    AgentResult {
                        agent,
                        success: false,
                        confidence: 0.0,
                        recommendation: None,
                        weight,
                        response_time_ms,
                        error: Some(err.to_string()),
                        payload: serde_json::Value::Null,
                    }
                }
            };
            agent_results.insert(agent, entry);
        }

        let (confidence, recommendation, consensus_strength) = aggregate(&verdicts);

        self.memory.write().await.push(CollectiveOutcome {
            task_id: task.decision_id,
            confidence,
            recommendation,
            success: confidence > self.consensus_threshold,
            recorded_at: Utc::now(),
        });

        info!(
            decision_id = %task.decision_id,
            agents = agent_results.len(),
            succeeded = verdicts.len(),
            confidence,
            recommendation = %recommendation,
            consensus_strength,
            "Swarm consensus reached"
        );

        ConsensusResult {
            agent_results,
            confidence,
            recommendation,
            consensus_strength,
        }
    }

    pub async fn insights(&self) -> SwarmInsights {
        let (size, successes) = {
            let memory = self.memory.read().await;
            (memory.len(), memory.iter().filter(|o| o.success).count())
        };
        SwarmInsights {
            registered_agents: self.registered(),
            collective_memory_size: size,
            collective_success_ratio: if size > 0 {
                successes as f64 / size as f64
            } else {
                0.0
            },
            consensus_threshold: self.consensus_threshold,
            agent_performance: self.performance.all().await,
        }
    }
}
