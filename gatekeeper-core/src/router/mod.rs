//! Resolution routing
//!
//! A pure threshold decision over confidence, risk and priority:
//!
//! | Check                                    | Path                 | Reason            |
//! |------------------------------------------|----------------------|-------------------|
//! | priority is critical                     | escalation           | critical priority |
//! | confidence and risk both within limits   | automated_resolution | none              |
//! | both fail, each within the marginal band | escalation           | complex issue     |
//! | confidence below threshold               | escalation           | low confidence    |
//! | risk above threshold                     | escalation           | high risk         |
//!
//! Risk fed to the router is combined from triage, scorer and swarm
//! signals by [`combined_risk`].

pub mod handoff;
pub mod resolution;
pub mod risk;

pub use handoff::{EscalationContext, SimilarCase};
pub use resolution::{
    EscalationReason, ResolutionPath, ResolutionRouter, RoutingDecision, RoutingThresholds,
};
pub use risk::{combined_risk, RiskInputs};
