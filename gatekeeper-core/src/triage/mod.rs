//! Request triage: category, urgency, complexity and automation feasibility.

pub mod classifier;
pub mod prompts;
pub mod types;

pub use classifier::{TriageClassifier, TriageStage, CATEGORY_OUTCOME_CAPACITY};
pub use types::{Category, CategoryProfile, Level, RoutingHint, TriageAnalysis, Urgency};
