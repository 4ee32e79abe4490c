//! Gatekeeper Core
//!
//! Decides whether a support request can be resolved automatically or must
//! be escalated to a human, and learns from how those decisions turn out.
//!
//! # Components
//!
//! - [`knowledge`]: similarity matching of a request against knowledge items
//! - [`confidence`]: multi-factor confidence score with adaptive weights
//! - [`triage`]: two-pass LLM classification with contextual adjustment
//! - [`swarm`]: concurrent scoring agents and weighted consensus
//! - [`router`]: threshold routing, combined risk, escalation payloads
//! - [`feedback`]: outcome feedback driving all online learning
//! - [`engine`]: the [`Gatekeeper`] façade wiring them together
//!
//! # Usage
//!
//! ```ignore
//! use gatekeeper_core::{Gatekeeper, GatekeeperConfig, MemoryStore, RequestContext};
//!
//! let config = GatekeeperConfig::load("config/gatekeeper.toml".as_ref())?;
//! let engine = Gatekeeper::new(config, embedder, completer, index, Arc::new(MemoryStore::new()))?;
//! engine.restore().await?;
//!
//! let evaluation = engine
//!     .evaluate("I forgot my password", &RequestContext::new())
//!     .await?;
//! println!("{}", evaluation.decision.path);
//! ```

pub mod confidence;
pub mod config;
pub mod context;
pub mod engine;
pub mod feedback;
pub mod history;
pub mod knowledge;
pub mod persistence;
pub mod resilience;
pub mod router;
pub mod services;
pub mod swarm;
pub mod text;
pub mod triage;

#[cfg(test)]
pub(crate) mod test_support;

pub use confidence::{
    ConfidenceAssessment, ConfidenceFactors, ConfidenceScorer, Factor, PredictionModel,
};
pub use config::{ConfigError, GatekeeperConfig};
pub use context::{Priority, RequestContext, UserLevel};
pub use engine::{
    EngineError, EngineInsights, Evaluation, EvaluationAudit, Gatekeeper, RestoreSummary,
};
pub use feedback::{DecisionRecord, FeedbackRecord, LearningReport, ResolutionOutcome};
pub use knowledge::{KnowledgeItem, SimilarityIndex};
pub use persistence::{HistoryEntry, MemoryStore, PersistenceStore, StoreError, StoreSnapshot};
pub use resilience::{FallbackKind, FallbackNote, Outcome};
pub use router::{EscalationReason, ResolutionPath, RoutingDecision};
pub use services::{CompletionRequest, CompletionService, EmbeddingService, ModelTier, ServiceError};
pub use swarm::{AgentPerformanceRecord, AgentType, ConsensusResult, Recommendation};
pub use triage::{Category, TriageAnalysis, Urgency};
