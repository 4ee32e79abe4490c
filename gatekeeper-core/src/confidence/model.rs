use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::factors::{ConfidenceFactors, Factor};
use crate::config::ScoringConfig;
use crate::history::BoundedHistory;

/// Accuracy samples kept for the running model accuracy.
pub const ACCURACY_HISTORY_CAPACITY: usize = 1000;

/// One weight before and after a learning step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub factor: Factor,
    pub before: f64,
    pub after: f64,
}

/// Adaptive weighted-sum model behind the confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionModel {
    pub weights: BTreeMap<Factor, f64>,
    pub bias: f64,
    pub accuracy_history: BoundedHistory<f64>,
    pub last_updated: DateTime<Utc>,
}

impl PredictionModel {
    pub fn new(weights: BTreeMap<Factor, f64>, bias: f64) -> Self {
        Self {
            weights,
            bias,
            accuracy_history: BoundedHistory::new(ACCURACY_HISTORY_CAPACITY),
            last_updated: Utc::now(),
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(config.feature_weights.clone(), config.bias)
    }

    /// Weighted mean of the weighted factors present, plus bias, in [0, 1].
    /// 0.5 before bias when no weighted factor is present.
    pub fn predict(&self, factors: &ConfidenceFactors) -> f64 {
        let (weighted, total) = self
            .weights
            .iter()
            .filter_map(|(factor, weight)| factors.get(*factor).map(|v| (v * weight, *weight)))
            .fold((0.0, 0.0), |(sum, total), (v, w)| (sum + v, total + w));

        let normalized = if total > 0.0 { weighted / total } else { 0.5 };
        let score = normalized + self.bias;
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Mean of recorded accuracies.
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy_history.mean()
    }

    pub fn record_accuracy(&mut self, accuracy: f64) {
        self.accuracy_history.push(accuracy.clamp(0.0, 1.0));
        self.last_updated = Utc::now();
    }

    /// Bring a model loaded from outside back within the engine's limits:
    /// the accuracy history is re-capped, accuracies are clamped, weights
    /// land in `[floor, ceiling]` (zero stays disabled, non-finite or
    /// negative becomes `floor`) and a non-finite bias resets to 0.
    /// Returns how many values were changed.
    pub fn sanitize(&mut self, floor: f64, ceiling: f64) -> usize {
        let mut changed = 0;

        if self.accuracy_history.capacity() != ACCURACY_HISTORY_CAPACITY {
            changed += 1;
        }
        let accuracies: Vec<f64> = self.accuracy_history.iter().copied().collect();
        let mut history = BoundedHistory::new(ACCURACY_HISTORY_CAPACITY);
        for accuracy in accuracies {
            let clamped = if accuracy.is_finite() {
                accuracy.clamp(0.0, 1.0)
            } else {
                0.0
            };
            if clamped != accuracy {
                changed += 1;
            }
            history.push(clamped);
        }
        self.accuracy_history = history;

        for weight in self.weights.values_mut() {
            if *weight == 0.0 {
                continue;
            }
            let fixed = if weight.is_finite() && *weight > 0.0 {
                weight.clamp(floor, ceiling)
            } else {
                floor
            };
            if fixed != *weight {
                *weight = fixed;
                changed += 1;
            }
        }

        if !self.bias.is_finite() {
            self.bias = 0.0;
            changed += 1;
        }
        changed
    }

    /// Multiplicative step on every weighted factor of `factors`:
    /// shrink after over-prediction, grow otherwise. Results are clamped to
    /// `[floor, ceiling]`; a zero weight stays disabled.
    pub fn adjust_weights(
        &mut self,
        factors: &ConfidenceFactors,
        predicted: f64,
        actual: f64,
        learning_rate: f64,
        floor: f64,
        ceiling: f64,
    ) -> Vec<WeightChange> {
        let over_predicted = predicted > actual;
        let mut changes = Vec::new();

        for (factor, value) in factors.iter() {
            let Some(weight) = self.weights.get_mut(&factor) else {
                continue;
            };
            let before = *weight;
            if before <= 0.0 {
                continue;
            }

            let step = learning_rate * value;
            let raw = if over_predicted {
                before * (1.0 - step)
            } else {
                before * (1.0 + step)
            };
            *weight = raw.clamp(floor, ceiling);
            changes.push(WeightChange {
                factor,
                before,
                after: *weight,
            });
        }

        self.last_updated = Utc::now();
        changes
    }
}
