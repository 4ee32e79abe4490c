use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::confidence::{request_hash, ConfidenceFactors, ScoredDecision};
use crate::router::ResolutionPath;
use crate::swarm::{AgentType, ConsensusResult};
use crate::text;
use crate::triage::Category;

/// What happened after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved,
    NotResolved,
    PartiallyResolved,
}

impl ResolutionOutcome {
    /// Outcome on the same scale as predicted confidence.
    pub fn value(&self) -> f64 {
        match self {
            Self::Resolved => 1.0,
            Self::PartiallyResolved => 0.5,
            Self::NotResolved => 0.0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved => write!(f, "resolved"),
            Self::NotResolved => write!(f, "not_resolved"),
            Self::PartiallyResolved => write!(f, "partially_resolved"),
        }
    }
}

/// One feedback submission for a past decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub decision_id: Uuid,
    pub outcome: ResolutionOutcome,
    /// User satisfaction, 0.0–1.0.
    pub satisfaction: f64,
    /// Explicit accuracy signal; replaces the outcome value when present.
    #[serde(default)]
    pub confidence_accuracy: Option<f64>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(decision_id: Uuid, outcome: ResolutionOutcome, satisfaction: f64) -> Self {
        Self {
            decision_id,
            outcome,
            satisfaction,
            confidence_accuracy: None,
            comments: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn with_confidence_accuracy(mut self, accuracy: f64) -> Self {
        self.confidence_accuracy = Some(accuracy);
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Observed outcome compared against the predicted confidence.
    pub fn actual_outcome(&self) -> f64 {
        self.confidence_accuracy
            .unwrap_or_else(|| self.outcome.value())
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.satisfaction) {
            return Err(format!(
                "satisfaction must be within [0, 1], got {}",
                self.satisfaction
            ));
        }
        if let Some(accuracy) = self.confidence_accuracy {
            if !(0.0..=1.0).contains(&accuracy) {
                return Err(format!(
                    "confidence_accuracy must be within [0, 1], got {accuracy}"
                ));
            }
        }
        Ok(())
    }
}

/// How one agent took part in a decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentParticipation {
    pub agent: AgentType,
    pub success: bool,
    pub response_time_ms: u64,
}

/// Everything a later feedback event needs about a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: Uuid,
    pub request_hash: String,
    pub request_text: String,
    pub factors: ConfidenceFactors,
    pub predicted_confidence: f64,
    pub triage_category: Option<Category>,
    pub agents: Vec<AgentParticipation>,
    pub path: ResolutionPath,
    pub created_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(
        decision_id: Uuid,
        request_text: &str,
        factors: ConfidenceFactors,
        predicted_confidence: f64,
        path: ResolutionPath,
    ) -> Self {
        Self {
            decision_id,
            request_hash: request_hash(request_text),
            request_text: request_text.to_string(),
            factors,
            predicted_confidence,
            triage_category: None,
            agents: Vec::new(),
            path,
            created_at: Utc::now(),
        }
    }

    pub fn with_triage_category(mut self, category: Category) -> Self {
        self.triage_category = Some(category);
        self
    }

    pub fn with_consensus(mut self, consensus: &ConsensusResult) -> Self {
        self.agents = consensus
            .agent_results
            .values()
            .map(|r| AgentParticipation {
                agent: r.agent,
                success: r.success,
                response_time_ms: r.response_time_ms,
            })
            .collect();
        self
    }

    /// Scorer history entry for this decision, rated when feedback exists.
    pub fn to_scored(&self, feedback: Option<&FeedbackRecord>) -> ScoredDecision {
        ScoredDecision {
            decision_id: self.decision_id,
            request_hash: self.request_hash.clone(),
            words: text::word_set(&self.request_text),
            factors: self.factors.clone(),
            predicted: self.predicted_confidence,
            actual_outcome: feedback.map(FeedbackRecord::actual_outcome),
            scored_at: self.created_at,
        }
    }
}
