//! Outcome feedback and the learning it drives.
//!
//! ```text
//!  FeedbackRecord ──► LearningFeedbackLoop
//!                       ├─► ConfidenceScorer   rate decision, adjust weights
//!                       ├─► AgentPerformance   one sample per contributing agent
//!                       ├─► TriageClassifier   per-category success history
//!                       └─► PersistenceStore   feedback, model, agent records
//! ```

pub mod learning_loop;
pub mod record;

pub use learning_loop::{LearningFeedbackLoop, LearningReport};
pub use record::{AgentParticipation, DecisionRecord, FeedbackRecord, ResolutionOutcome};
