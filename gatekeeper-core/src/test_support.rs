//! Record builders shared by unit tests.

use std::sync::Arc;
use uuid::Uuid;

use crate::confidence::{ConfidenceAssessment, ConfidenceFactors, Factor};
use crate::context::Priority;
use crate::knowledge::{KnowledgeItem, MatchBreakdown, SimilarityMatch};
use crate::swarm::SwarmTask;
use crate::triage::{Category, RoutingHint, TriageAnalysis, Urgency};

pub fn matched(id: &str, content: &str, score: f64) -> SimilarityMatch {
    SimilarityMatch {
        item: Arc::new(KnowledgeItem::new(id, content, vec![])),
        score,
        breakdown: MatchBreakdown {
            cosine: score,
            jaccard: 0.0,
            keyword_overlap: 0.0,
        },
    }
}

/// Assessment with the given final score, complexity factor and best match.
pub fn assessment(score: f64, complexity: f64, best_match: Option<f64>) -> ConfidenceAssessment {
    let top_matches: Vec<_> = best_match
        .map(|s| matched("kb-1", "Step by step guide", s))
        .into_iter()
        .collect();
    let factors = ConfidenceFactors::new()
        .with(Factor::Similarity, best_match.unwrap_or(0.0))
        .with(Factor::Complexity, complexity)
        .with(Factor::Quality, best_match.unwrap_or(0.0));

    ConfidenceAssessment {
        factors,
        score,
        reasoning: "test".to_string(),
        top_matches,
        model_accuracy: None,
    }
}

pub fn triage(category: Category, calibrated: f64, routing: RoutingHint) -> TriageAnalysis {
    TriageAnalysis {
        category,
        subcategory: "test".to_string(),
        urgency: Urgency::Medium,
        complexity: 3,
        automation_feasibility: 0.8,
        risk_level: 0.0,
        confidence: calibrated,
        calibrated_confidence: calibrated,
        risk_score: 0.1,
        capability_match: 1.0,
        keywords: Vec::new(),
        emotional_state: "neutral".to_string(),
        expertise_required: "general".to_string(),
        risk_factors: Vec::new(),
        reasoning: String::new(),
        routing,
        escalation_hint: None,
        fast_pass_fallback: false,
        deep_pass_fallback: false,
    }
}

pub fn task(assessment: ConfidenceAssessment, triage: TriageAnalysis) -> SwarmTask {
    SwarmTask {
        decision_id: Uuid::new_v4(),
        request_text: "reset my password".to_string(),
        priority: Priority::Medium,
        assessment,
        triage,
        confidence_threshold: 0.8,
    }
}
