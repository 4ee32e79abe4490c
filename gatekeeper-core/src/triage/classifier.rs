//! Two-pass triage classifier
//!
//! Stages run in order for every request:
//!
//! ```text
//! FastPass ──▶ DeepPass ──▶ ContextualAdjust ──▶ Synthesize
//!  (fast model)  (deep model)   (user level,         (TriageAnalysis,
//!                                priority)            routing hint)
//! ```
//!
//! Either completion may fail or return unusable JSON; the stage then
//! resolves to its documented default and the analysis records it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::prompts;
use super::types::{
    Category, DeepPassResponse, FastPassResponse, RoutingHint, TriageAnalysis, Urgency,
};
use crate::context::{Priority, RequestContext, UserLevel};
use crate::history::BoundedHistory;
use crate::resilience::{with_fallback, FallbackNote};
use crate::services::{complete_structured, CompletionRequest, CompletionService, ModelTier};
use crate::text;

/// Outcomes remembered per category.
pub const CATEGORY_OUTCOME_CAPACITY: usize = 50;
/// Outcomes consulted for the learning adjustment.
const LEARNING_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageStage {
    FastPass,
    DeepPass,
    ContextualAdjust,
    Synthesize,
}

impl std::fmt::Display for TriageStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FastPass => write!(f, "fast_pass"),
            Self::DeepPass => write!(f, "deep_pass"),
            Self::ContextualAdjust => write!(f, "contextual_adjust"),
            Self::Synthesize => write!(f, "synthesize"),
        }
    }
}

fn fast_fallback(request_text: &str) -> FastPassResponse {
    FastPassResponse {
        primary_category: Category::GeneralInquiry,
        confidence: 0.3,
        urgency: Urgency::Medium,
        keywords: text::leading_words(request_text, 5),
    }
}

fn deep_fallback() -> DeepPassResponse {
    DeepPassResponse {
        intent: "seek_assistance".to_string(),
        complexity: 5.0,
        emotional_state: "neutral".to_string(),
        expertise_required: "general".to_string(),
        risk_factors: vec!["moderate_complexity".to_string()],
        automation_feasibility: 0.5,
        reasoning: "Analysis failed, using defaults".to_string(),
    }
}

/// Values produced by the ContextualAdjust stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextualAdjustment {
    pub complexity: u8,
    pub risk_level: f64,
    pub capability_match: f64,
    pub confidence: f64,
}

fn complexity_modifier(level: UserLevel) -> i32 {
    match level {
        UserLevel::Beginner => 2,
        UserLevel::Intermediate => 0,
        UserLevel::Advanced => -1,
    }
}

fn risk_modifier(priority: Priority) -> f64 {
    match priority {
        Priority::Critical => 0.3,
        Priority::High => 0.1,
        Priority::Medium => 0.0,
        Priority::Low => -0.1,
    }
}

/// Share of the category's required capability the user brings, at most 1.
pub fn capability_match(category: Category, level: UserLevel) -> f64 {
    let required = category.profile().required_capability;
    let capability = level.capability();
    if capability >= required {
        1.0
    } else {
        capability / required
    }
}

/// Apply user level and priority to the raw pass outputs.
pub fn contextual_adjust(
    fast: &FastPassResponse,
    deep: &DeepPassResponse,
    context: &RequestContext,
    priority: Priority,
) -> ContextualAdjustment {
    let raw_complexity = if deep.complexity.is_finite() {
        deep.complexity.round().clamp(1.0, 10.0) as i32
    } else {
        5
    };
    let complexity = (raw_complexity + complexity_modifier(context.user_level)).clamp(1, 10) as u8;

    // Each reported risk factor adds 0.1, saturating at 0.4.
    let base_risk = (deep.risk_factors.len() as f64 * 0.1).min(0.4);
    let risk_level = (base_risk + risk_modifier(priority)).clamp(0.0, 1.0);

    let mut confidence = clamp_unit(fast.confidence);
    match context.user_level {
        UserLevel::Advanced => confidence += 0.1,
        UserLevel::Beginner => confidence -= 0.1,
        UserLevel::Intermediate => {}
    }
    if priority.is_elevated() {
        confidence -= 0.05;
    }

    ContextualAdjustment {
        complexity,
        risk_level,
        capability_match: capability_match(fast.primary_category, context.user_level),
        confidence: confidence.clamp(0.0, 1.0),
    }
}

/// Routing hint plus the confidence adjustment it implies.
pub fn routing_recommendation(
    category: Category,
    complexity: u8,
    feasibility: f64,
) -> (RoutingHint, f64) {
    if feasibility > 0.7 && complexity <= 6 {
        (RoutingHint::Research, 0.1)
    } else if category.is_routine() && complexity <= 4 {
        (RoutingHint::Research, 0.2)
    } else if complexity > 8 || feasibility < 0.3 {
        (RoutingHint::HumanExpert, -0.3)
    } else {
        (RoutingHint::Research, 0.0)
    }
}

pub fn escalation_hint(complexity: u8, feasibility: f64, risk_level: f64) -> Option<String> {
    if complexity > 8 {
        Some("High complexity requires human expertise".to_string())
    } else if feasibility < 0.3 {
        Some("Low automation feasibility".to_string())
    } else if risk_level > 0.7 {
        Some("High risk requires human oversight".to_string())
    } else {
        None
    }
}

/// Triage risk from the adjusted risk level, category and complexity.
pub fn risk_score(category: Category, risk_level: f64, complexity: u8) -> f64 {
    let category_risk = category.profile().risk.risk_value();
    let complexity_risk = (f64::from(complexity) / 10.0 * 0.3).min(0.3);
    ((risk_level + category_risk + complexity_risk) / 3.0).clamp(0.0, 1.0)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// LLM-assisted triage with per-category outcome learning.
pub struct TriageClassifier {
    completer: Arc<dyn CompletionService>,
    timeout: Duration,
    outcomes: RwLock<HashMap<Category, BoundedHistory<bool>>>,
}

impl TriageClassifier {
    pub fn new(completer: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self {
            completer,
            timeout,
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    /// Run all four stages. Returns the analysis and a note for every pass
    /// that fell back.
    pub async fn classify(
        &self,
        request_text: &str,
        context: &RequestContext,
        priority: Priority,
    ) -> (TriageAnalysis, Vec<FallbackNote>) {
        let mut notes = Vec::new();

        debug!(stage = %TriageStage::FastPass, "Triage stage");
        let request = CompletionRequest::structured::<FastPassResponse>(
            prompts::fast_pass(request_text),
            ModelTier::Fast,
        )
        .with_max_tokens(300);
        let (fast, fast_note) = with_fallback(
            "triage.fast_pass",
            self.timeout,
            complete_structured::<FastPassResponse>(self.completer.as_ref(), &request),
            || fast_fallback(request_text),
        )
        .await
        .into_parts();
        let fast_pass_fallback = fast_note.is_some();
        notes.extend(fast_note);

        debug!(stage = %TriageStage::DeepPass, "Triage stage");
        let request = CompletionRequest::structured::<DeepPassResponse>(
            prompts::deep_pass(request_text, context),
            ModelTier::Deep,
        )
        .with_temperature(0.2)
        .with_max_tokens(800);
        let (deep, deep_note) = with_fallback(
            "triage.deep_pass",
            self.timeout,
            complete_structured::<DeepPassResponse>(self.completer.as_ref(), &request),
            deep_fallback,
        )
        .await
        .into_parts();
        let deep_pass_fallback = deep_note.is_some();
        notes.extend(deep_note);

        debug!(stage = %TriageStage::ContextualAdjust, "Triage stage");
        let adjusted = contextual_adjust(&fast, &deep, context, priority);

        debug!(stage = %TriageStage::Synthesize, "Triage stage");
        let category = fast.primary_category;
        let fast_confidence = clamp_unit(fast.confidence);
        let feasibility = clamp_unit(deep.automation_feasibility);
        let (routing, routing_adjustment) =
            routing_recommendation(category, adjusted.complexity, feasibility);
        let learning_adjustment = self.learning_adjustment(category).await;

        let calibrated_confidence = (fast_confidence.min(feasibility)
            + category.profile().confidence_boost
            + routing_adjustment
            + learning_adjustment)
            .clamp(0.0, 1.0);

        let analysis = TriageAnalysis {
            category,
            subcategory: deep.intent,
            urgency: fast.urgency,
            complexity: adjusted.complexity,
            automation_feasibility: feasibility,
            risk_level: adjusted.risk_level,
            confidence: (fast_confidence + adjusted.confidence) / 2.0,
            calibrated_confidence,
            risk_score: risk_score(category, adjusted.risk_level, adjusted.complexity),
            capability_match: adjusted.capability_match,
            keywords: fast.keywords,
            emotional_state: deep.emotional_state,
            expertise_required: deep.expertise_required,
            risk_factors: deep.risk_factors,
            reasoning: deep.reasoning,
            routing,
            escalation_hint: escalation_hint(adjusted.complexity, feasibility, adjusted.risk_level),
            fast_pass_fallback,
            deep_pass_fallback,
        };

        info!(
            category = %analysis.category,
            urgency = %analysis.urgency,
            complexity = analysis.complexity,
            confidence = analysis.confidence,
            fallbacks = notes.len(),
            "Triage complete"
        );

        (analysis, notes)
    }

    /// ±0.1 from the recent success rate of this category, 0 without history.
    pub async fn learning_adjustment(&self, category: Category) -> f64 {
        let outcomes = self.outcomes.read().await;
        let Some(history) = outcomes.get(&category) else {
            return 0.0;
        };
        let recent: Vec<bool> = history.recent(LEARNING_WINDOW).copied().collect();
        if recent.is_empty() {
            return 0.0;
        }

        let success_rate = recent.iter().filter(|s| **s).count() as f64 / recent.len() as f64;
        if success_rate > 0.8 {
            0.1
        } else if success_rate < 0.5 {
            -0.1
        } else {
            0.0
        }
    }

    pub async fn record_outcome(&self, category: Category, success: bool) {
        self.outcomes
            .write()
            .await
            .entry(category)
            .or_insert_with(|| BoundedHistory::new(CATEGORY_OUTCOME_CAPACITY))
            .push(success);
    }
}
