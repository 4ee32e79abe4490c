//! Swarm consensus over scoring agents
//!
//! ```text
//!                 SwarmTask (Arc)
//!        ┌───────────┼────────────┐
//!        ▼           ▼            ▼
//!   TriageAgent  ConfidenceAgent  ResearchAgent      (concurrent, per-agent timeout)
//!        └───────────┼────────────┘
//!                    ▼
//!     aggregate(confidence × weight, label weights)
//!                    │
//!                    ▼
//!   ConsensusResult { confidence, recommendation, consensus_strength }
//! ```
//!
//! Agent weights are each agent's success rate from the performance
//! table, snapshotted once per task.

pub mod agents;
pub mod consensus;
pub mod performance;

pub use agents::{
    builtin, AgentError, AgentType, AgentVerdict, ConfidenceAgent, Recommendation, ResearchAgent,
    ScoringAgent, SwarmTask, TriageAgent,
};
pub use consensus::{
    aggregate, AgentResult, CollectiveOutcome, ConsensusResult, SwarmConsensus, SwarmInsights,
    COLLECTIVE_MEMORY_CAPACITY,
};
pub use performance::{
    AgentFeedbackSample, AgentPerformanceRecord, AgentPerformanceTable, DEFAULT_AGENT_WEIGHT,
};
