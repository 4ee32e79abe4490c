//! Scoring agents consulted by the swarm.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use crate::confidence::{ConfidenceAssessment, Factor};
use crate::context::Priority;
use crate::triage::TriageAnalysis;

/// Kinds of scoring agent. Small and fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Triage,
    Confidence,
    Research,
}

impl AgentType {
    pub const ALL: [AgentType; 3] = [AgentType::Triage, AgentType::Confidence, AgentType::Research];
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Triage => write!(f, "triage"),
            Self::Confidence => write!(f, "confidence"),
            Self::Research => write!(f, "research"),
        }
    }
}

/// What an agent, or the swarm as a whole, recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Automate,
    Escalate,
    InsufficientData,
}

impl Recommendation {
    /// Tie-break rank; the more cautious label wins.
    pub(crate) fn caution(&self) -> u8 {
        match self {
            Self::Automate => 0,
            Self::InsufficientData => 1,
            Self::Escalate => 2,
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Automate => write!(f, "automate"),
            Self::Escalate => write!(f, "escalate"),
            Self::InsufficientData => write!(f, "insufficient_data"),
        }
    }
}

/// Everything an agent may look at for one request.
#[derive(Debug, Clone)]
pub struct SwarmTask {
    pub decision_id: Uuid,
    pub request_text: String,
    pub priority: Priority,
    pub assessment: ConfidenceAssessment,
    pub triage: TriageAnalysis,
    /// Routing threshold the confidence agent measures itself against.
    pub confidence_threshold: f64,
}

/// One agent's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVerdict {
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("Agent {0} is not registered")]
    NotRegistered(AgentType),

    #[error("Agent timed out after {0:?}")]
    Timeout(Duration),

    #[error("Agent failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ScoringAgent: Send + Sync {
    fn agent_type(&self) -> AgentType;

    async fn evaluate(&self, task: &SwarmTask) -> Result<AgentVerdict, AgentError>;
}

/// Votes with the calibrated triage confidence.
pub struct TriageAgent;

#[async_trait]
impl ScoringAgent for TriageAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Triage
    }

    async fn evaluate(&self, task: &SwarmTask) -> Result<AgentVerdict, AgentError> {
        let triage = &task.triage;
        let recommendation = if triage.favors_automation() {
            Recommendation::Automate
        } else {
            Recommendation::Escalate
        };
        Ok(AgentVerdict {
            confidence: triage.calibrated_confidence,
            recommendation,
            payload: json!({
                "category": triage.category,
                "routing": triage.routing,
                "escalation_hint": triage.escalation_hint,
                "risk_score": triage.risk_score,
            }),
        })
    }
}

/// Votes with the multi-factor confidence score.
pub struct ConfidenceAgent;

#[async_trait]
impl ScoringAgent for ConfidenceAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Confidence
    }

    async fn evaluate(&self, task: &SwarmTask) -> Result<AgentVerdict, AgentError> {
        let score = task.assessment.score;
        let recommendation = if score >= task.confidence_threshold {
            Recommendation::Automate
        } else {
            Recommendation::Escalate
        };
        Ok(AgentVerdict {
            confidence: score,
            recommendation,
            payload: json!({ "reasoning": task.assessment.reasoning }),
        })
    }
}

/// Judges whether the knowledge base holds a usable answer.
pub struct ResearchAgent;

/// Best match score a researched answer needs.
const RESEARCH_MIN_SIMILARITY: f64 = 0.6;

impl ResearchAgent {
    /// How complex the request reads, the inverse of the complexity factor.
    pub fn research_complexity(assessment: &ConfidenceAssessment) -> f64 {
        1.0 - assessment.factors.get(Factor::Complexity).unwrap_or(0.5)
    }
}

#[async_trait]
impl ScoringAgent for ResearchAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Research
    }

    async fn evaluate(&self, task: &SwarmTask) -> Result<AgentVerdict, AgentError> {
        let assessment = &task.assessment;
        let best = assessment.top_matches.first();
        let similarity = best.map(|m| m.score).unwrap_or(0.0);
        let quality = assessment.factors.get(Factor::Quality).unwrap_or(0.0);
        let complexity = Self::research_complexity(assessment);

        let recommendation = if similarity > RESEARCH_MIN_SIMILARITY && complexity <= 0.5 {
            Recommendation::Automate
        } else {
            Recommendation::Escalate
        };

        Ok(AgentVerdict {
            confidence: ((similarity + quality) / 2.0).clamp(0.0, 1.0),
            recommendation,
            payload: json!({
                "best_match": best.map(|m| m.item.id.clone()),
                "solution_type": best.map(|m| m.item.metadata.solution_type),
                "research_complexity": complexity,
            }),
        })
    }
}

/// The built-in agent for `agent_type`.
pub fn builtin(agent_type: AgentType) -> std::sync::Arc<dyn ScoringAgent> {
    match agent_type {
        AgentType::Triage => std::sync::Arc::new(TriageAgent),
        AgentType::Confidence => std::sync::Arc::new(ConfidenceAgent),
        AgentType::Research => std::sync::Arc::new(ResearchAgent),
    }
}
