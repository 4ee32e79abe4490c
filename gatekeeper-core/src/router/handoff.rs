//! Context handed to the human who receives an escalation.

use serde::{Deserialize, Serialize};

use super::resolution::RoutingDecision;
use crate::confidence::ConfidenceAssessment;
use crate::swarm::ConsensusResult;
use crate::triage::TriageAnalysis;

/// Knowledge items worth pointing the human at.
const RELEVANT_MATCH: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCase {
    pub item_id: String,
    pub title: String,
    pub score: f64,
}

/// Enriched escalation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationContext {
    pub reason: String,
    pub confidence: f64,
    pub risk: f64,
    pub category: String,
    pub urgency: String,
    pub complexity: u8,
    pub risk_factors: Vec<String>,
    pub swarm_recommendation: String,
    pub consensus_strength: f64,
    pub confidence_reasoning: String,
    pub similar_cases: Vec<SimilarCase>,
    pub suggested_actions: Vec<String>,
}

impl EscalationContext {
    /// `None` for automated decisions.
    pub fn build(
        decision: &RoutingDecision,
        assessment: &ConfidenceAssessment,
        triage: &TriageAnalysis,
        consensus: &ConsensusResult,
    ) -> Option<Self> {
        let reason = decision.reason_text()?;

        let similar_cases: Vec<SimilarCase> = assessment
            .top_matches
            .iter()
            .map(|m| SimilarCase {
                item_id: m.item.id.clone(),
                title: m.item.title.clone(),
                score: m.score,
            })
            .collect();

        let mut suggested_actions: Vec<String> = triage.escalation_hint.iter().cloned().collect();
        suggested_actions.extend(
            similar_cases
                .iter()
                .filter(|c| c.score > RELEVANT_MATCH)
                .map(|c| format!("Review knowledge item {}", c.item_id)),
        );

        Some(Self {
            reason,
            confidence: decision.confidence,
            risk: decision.risk,
            category: triage.category.to_string(),
            urgency: triage.urgency.to_string(),
            complexity: triage.complexity,
            risk_factors: triage.risk_factors.clone(),
            swarm_recommendation: consensus.recommendation.to_string(),
            consensus_strength: consensus.consensus_strength,
            confidence_reasoning: assessment.reasoning.clone(),
            similar_cases,
            suggested_actions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Priority;
    use crate::router::{ResolutionRouter, RoutingThresholds};
    use crate::swarm::Recommendation;
    use crate::test_support::{assessment, triage};
    use crate::triage::{Category, RoutingHint};
    use std::collections::BTreeMap;

    fn consensus() -> ConsensusResult {
        ConsensusResult {
            agent_results: BTreeMap::new(),
            confidence: 0.4,
            recommendation: Recommendation::Escalate,
            consensus_strength: 0.7,
        }
    }

    fn router() -> ResolutionRouter {
        ResolutionRouter::new(RoutingThresholds {
            confidence_threshold: 0.8,
            risk_threshold: 0.3,
            marginal_band: 0.05,
        })
    }

    #[test]
    fn test_escalation_context() {
        let decision = router().decide(0.4, 0.2, Priority::Medium);
        let mut t = triage(Category::IntegrationIssue, 0.4, RoutingHint::HumanExpert);
        t.escalation_hint = Some("High complexity requires human expertise".into());

        let ctx = EscalationContext::build(
            &decision,
            &assessment(0.4, 0.5, Some(0.7)),
            &t,
            &consensus(),
        )
        .unwrap();
        assert!(ctx.reason.starts_with("Low confidence score (0.40)"));
        assert_eq!(ctx.category, "integration_issue");
        assert_eq!(ctx.swarm_recommendation, "escalate");
        assert_eq!(ctx.similar_cases.len(), 1);
        assert_eq!(
            ctx.suggested_actions,
            vec![
                "High complexity requires human expertise".to_string(),
                "Review knowledge item kb-1".to_string()
            ]
        );
    }

    #[test]
    fn test_no_context_for_automation() {
        let decision = router().decide(0.9, 0.1, Priority::Low);
        let t = triage(Category::PasswordReset, 0.9, RoutingHint::Research);
        assert!(
            EscalationContext::build(&decision, &assessment(0.9, 0.8, Some(0.9)), &t, &consensus())
                .is_none()
        );
    }
}
