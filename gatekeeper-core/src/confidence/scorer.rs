use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::factors::{self, ConfidenceFactors, Factor, PastPrediction};
use super::model::{PredictionModel, WeightChange};
use crate::config::ScoringConfig;
use crate::context::{Priority, RequestContext};
use crate::history::BoundedHistory;
use crate::knowledge::SimilarityMatch;
use crate::text;

/// Scored decisions retained for historical factors and learning.
pub const SCORED_HISTORY_CAPACITY: usize = 2000;
/// How far back the historical factors look.
const HISTORICAL_WINDOW: usize = 100;
const TOP_MATCHES: usize = 5;

/// A scored request kept for later learning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDecision {
    pub decision_id: Uuid,
    pub request_hash: String,
    pub words: HashSet<String>,
    pub factors: ConfidenceFactors,
    pub predicted: f64,
    /// Filled in once feedback arrives.
    pub actual_outcome: Option<f64>,
    pub scored_at: DateTime<Utc>,
}

/// Output of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceAssessment {
    pub factors: ConfidenceFactors,
    /// Final score in [0, 1].
    pub score: f64,
    pub reasoning: String,
    pub top_matches: Vec<SimilarityMatch>,
    /// Mean accuracy of past predictions, if any were rated.
    pub model_accuracy: Option<f64>,
}

/// Result of one model learning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUpdate {
    pub accuracy: f64,
    pub weight_changes: Vec<WeightChange>,
}

/// blake3 hex digest of the normalized request text.
pub fn request_hash(request_text: &str) -> String {
    let normalized = text::words(request_text).join(" ");
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}

/// Multi-factor confidence scorer owning the adaptive model.
pub struct ConfidenceScorer {
    model: RwLock<PredictionModel>,
    history: RwLock<BoundedHistory<ScoredDecision>>,
    learning_rate: f64,
    weight_floor: f64,
    weight_ceiling: f64,
}

impl ConfidenceScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            model: RwLock::new(PredictionModel::from_config(config)),
            history: RwLock::new(BoundedHistory::new(SCORED_HISTORY_CAPACITY)),
            learning_rate: config.weight_learning_rate,
            weight_floor: config.weight_floor,
            weight_ceiling: config.weight_ceiling,
        }
    }

    /// Compute every factor, the final score and its reasoning, and record
    /// the decision for learning.
    pub async fn score(
        &self,
        decision_id: Uuid,
        request_text: &str,
        context: &RequestContext,
        priority: Priority,
        matches: &[SimilarityMatch],
    ) -> ConfidenceAssessment {
        let words = text::word_set(request_text);

        let mut values = ConfidenceFactors::new();
        values.insert(Factor::Similarity, factors::similarity(matches));
        values.insert(Factor::Consensus, factors::consensus(matches));
        values.insert(Factor::Complexity, factors::complexity(request_text));
        values.insert(Factor::Quality, factors::quality(matches));
        values.insert(Factor::Diversity, factors::diversity(matches));
        values.insert(
            Factor::UserExperience,
            factors::user_experience(context.user_level),
        );
        values.insert(Factor::PriorityImpact, factors::priority_impact(priority));
        values.insert(
            Factor::SystemContext,
            factors::system_context(context.system.as_deref()),
        );
        values.insert(Factor::TimePressure, factors::time_pressure(context.urgent));

        let (historical_accuracy, pattern_strength) = {
            let history = self.history.read().await;
            // Only rated decisions carry an outcome to compare against.
            let past = history.recent(HISTORICAL_WINDOW).filter_map(|d| {
                d.actual_outcome.map(|actual| PastPrediction {
                    words: &d.words,
                    predicted: d.predicted,
                    actual,
                })
            });
            factors::historical(&words, past)
        };
        values.insert(Factor::HistoricalAccuracy, historical_accuracy);
        values.insert(Factor::PatternStrength, pattern_strength);

        let (score, model_accuracy) = {
            let model = self.model.read().await;
            (model.predict(&values), model.accuracy())
        };
        let reasoning = explain(&values, matches);

        debug!(
            %decision_id,
            score,
            similarity = values.get(Factor::Similarity).unwrap_or(0.0),
            complexity = values.get(Factor::Complexity).unwrap_or(0.0),
            "Confidence scored"
        );

        self.history.write().await.push(ScoredDecision {
            decision_id,
            request_hash: request_hash(request_text),
            words,
            factors: values.clone(),
            predicted: score,
            actual_outcome: None,
            scored_at: Utc::now(),
        });

        ConfidenceAssessment {
            factors: values,
            score,
            reasoning,
            top_matches: matches.iter().take(TOP_MATCHES).cloned().collect(),
            model_accuracy,
        }
    }

    /// Attach an observed outcome to a recorded decision. Returns false when
    /// the decision has already been evicted.
    pub async fn record_outcome(&self, decision_id: Uuid, actual: f64) -> bool {
        let mut history = self.history.write().await;
        match history.find_recent_mut(|d| d.decision_id == decision_id) {
            Some(decision) => {
                decision.actual_outcome = Some(actual.clamp(0.0, 1.0));
                true
            }
            None => false,
        }
    }

    /// One serialized learning step on the model.
    pub async fn update_model(
        &self,
        factors: &ConfidenceFactors,
        predicted: f64,
        actual: f64,
    ) -> ModelUpdate {
        let accuracy = (1.0 - (predicted - actual).abs()).clamp(0.0, 1.0);

        let mut model = self.model.write().await;
        model.record_accuracy(accuracy);
        let weight_changes = model.adjust_weights(
            factors,
            predicted,
            actual,
            self.learning_rate,
            self.weight_floor,
            self.weight_ceiling,
        );

        ModelUpdate {
            accuracy,
            weight_changes,
        }
    }

    /// Snapshot of the model for persistence or inspection.
    pub async fn model(&self) -> PredictionModel {
        self.model.read().await.clone()
    }

    /// Install a persisted model, pulled back within the configured limits.
    pub async fn restore_model(&self, mut model: PredictionModel) {
        let adjusted = model.sanitize(self.weight_floor, self.weight_ceiling);
        if adjusted > 0 {
            warn!(adjusted, "Restored model had out-of-range values");
        }
        *self.model.write().await = model;
    }

    /// Seed the history with previously scored decisions, oldest first.
    pub async fn restore_history(&self, decisions: impl IntoIterator<Item = ScoredDecision>) {
        self.history.write().await.extend(decisions);
    }

    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }
}

/// Human-readable summary of what drove the score.
fn explain(values: &ConfidenceFactors, matches: &[SimilarityMatch]) -> String {
    let mut parts = Vec::new();

    if let Some(best) = matches.first() {
        let s = best.score;
        parts.push(if s > 0.8 {
            format!("Strong match found (similarity: {s:.2})")
        } else if s > 0.6 {
            format!("Good match found (similarity: {s:.2})")
        } else {
            format!("Limited similarity to known solutions (similarity: {s:.2})")
        });
    }

    let mut drivers: Vec<(Factor, f64)> = values.iter().collect();
    drivers.sort_by(|a, b| (b.1 - 0.5).abs().total_cmp(&(a.1 - 0.5).abs()));
    for (factor, value) in drivers.into_iter().take(3) {
        match factor {
            Factor::Consensus if value > 0.7 => {
                parts.push("Multiple supporting sources found".into())
            }
            Factor::Complexity if value < 0.5 => {
                parts.push("High complexity may require expert attention".into())
            }
            Factor::Quality if value > 0.8 => {
                parts.push("High-quality knowledge matches available".into())
            }
            _ => {}
        }
    }

    if values.get(Factor::HistoricalAccuracy).unwrap_or(0.0) > 0.7 {
        parts.push("Strong historical accuracy for similar requests".into());
    }

    if parts.is_empty() {
        format!("Confidence based on analysis of {} factors.", values.len())
    } else {
        format!("{}.", parts.join(". "))
    }
}
