//! Multi-factor confidence scoring
//!
//! ```text
//! matches ──┬─ similarity, consensus, quality, diversity
//! text ─────┼─ complexity
//! context ──┼─ user_experience, priority_impact, system_context, time_pressure
//! history ──┴─ historical_accuracy, pattern_strength
//!               │
//!               ▼
//!        PredictionModel (weighted mean + bias, clamped)
//!               │
//!               ▼
//!        ConfidenceAssessment { factors, score, reasoning }
//! ```
//!
//! The model is read by every scoring call and written only by the
//! feedback loop, one learning step at a time.

pub mod factors;
pub mod model;
pub mod scorer;

pub use factors::{ConfidenceFactors, Factor};
pub use model::{PredictionModel, WeightChange, ACCURACY_HISTORY_CAPACITY};
pub use scorer::{
    request_hash, ConfidenceAssessment, ConfidenceScorer, ModelUpdate, ScoredDecision,
    SCORED_HISTORY_CAPACITY,
};
