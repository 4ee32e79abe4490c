use serde::{Deserialize, Serialize};

use crate::config::RoutingConfig;
use crate::context::Priority;

/// Terminal path for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    AutomatedResolution,
    Escalation,
}

impl std::fmt::Display for ResolutionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutomatedResolution => write!(f, "automated_resolution"),
            Self::Escalation => write!(f, "escalation"),
        }
    }
}

/// Why a request went to a human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationReason {
    CriticalPriority,
    LowConfidence { confidence: f64 },
    HighRisk { risk: f64 },
    ComplexIssue,
    ProcessingError { message: String },
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CriticalPriority => {
                write!(f, "Critical priority issue — requires immediate human attention")
            }
            Self::LowConfidence { confidence } => write!(
                f,
                "Low confidence score ({confidence:.2}) - requires human expertise"
            ),
            Self::HighRisk { risk } => {
                write!(f, "High risk score ({risk:.2}) - requires human oversight")
            }
            Self::ComplexIssue => write!(f, "Complex issue requiring human intervention"),
            Self::ProcessingError { message } => write!(f, "Processing error: {message}"),
        }
    }
}

/// Routing outcome with the inputs it was decided on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub path: ResolutionPath,
    pub reason: Option<EscalationReason>,
    pub confidence: f64,
    pub risk: f64,
    pub priority: Priority,
}

impl RoutingDecision {
    pub fn is_automated(&self) -> bool {
        self.path == ResolutionPath::AutomatedResolution
    }

    pub fn reason_text(&self) -> Option<String> {
        self.reason.as_ref().map(ToString::to_string)
    }

    /// Escalation used when the pipeline itself failed.
    pub fn processing_error(message: impl Into<String>, priority: Priority) -> Self {
        Self {
            path: ResolutionPath::Escalation,
            reason: Some(EscalationReason::ProcessingError {
                message: message.into(),
            }),
            confidence: 0.0,
            risk: 1.0,
            priority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingThresholds {
    pub confidence_threshold: f64,
    pub risk_threshold: f64,
    pub marginal_band: f64,
}

impl From<&RoutingConfig> for RoutingThresholds {
    fn from(config: &RoutingConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            risk_threshold: config.risk_threshold,
            marginal_band: config.marginal_band,
        }
    }
}

/// Threshold router. No I/O, no state beyond its thresholds.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionRouter {
    thresholds: RoutingThresholds,
}

impl ResolutionRouter {
    pub fn new(thresholds: RoutingThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RoutingThresholds {
        &self.thresholds
    }

    pub fn decide(&self, confidence: f64, risk: f64, priority: Priority) -> RoutingDecision {
        // Non-finite inputs read as the least favourable value.
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let risk = if risk.is_finite() {
            risk.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let t = &self.thresholds;

        let escalate = |reason| RoutingDecision {
            path: ResolutionPath::Escalation,
            reason: Some(reason),
            confidence,
            risk,
            priority,
        };

        if priority == Priority::Critical {
            return escalate(EscalationReason::CriticalPriority);
        }

        let confidence_ok = confidence >= t.confidence_threshold;
        let risk_ok = risk <= t.risk_threshold;
        if confidence_ok && risk_ok {
            return RoutingDecision {
                path: ResolutionPath::AutomatedResolution,
                reason: None,
                confidence,
                risk,
                priority,
            };
        }

        let marginal = t.confidence_threshold - confidence <= t.marginal_band
            && risk - t.risk_threshold <= t.marginal_band;
        let reason = match (confidence_ok, risk_ok) {
            (false, false) if marginal => EscalationReason::ComplexIssue,
            (false, _) => EscalationReason::LowConfidence { confidence },
            (true, false) => EscalationReason::HighRisk { risk },
            (true, true) => EscalationReason::ComplexIssue,
        };
        escalate(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ResolutionRouter {
        ResolutionRouter::new(RoutingThresholds {
            confidence_threshold: 0.8,
            risk_threshold: 0.3,
            marginal_band: 0.05,
        })
    }

    #[test]
    fn test_confident_low_risk_automates() {
        let decision = router().decide(0.85, 0.2, Priority::Medium);
        assert_eq!(decision.path, ResolutionPath::AutomatedResolution);
        assert!(decision.reason.is_none());
        assert!(decision.is_automated());
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        assert!(router().decide(0.8, 0.3, Priority::Low).is_automated());
    }

    #[test]
    fn test_critical_always_escalates() {
        let decision = router().decide(0.9, 0.1, Priority::Critical);
        assert_eq!(decision.path, ResolutionPath::Escalation);
        assert_eq!(decision.reason, Some(EscalationReason::CriticalPriority));
        assert_eq!(
            decision.reason_text().as_deref(),
            Some("Critical priority issue — requires immediate human attention")
        );
    }

    #[test]
    fn test_reason_follows_failed_threshold() {
        let low = router().decide(0.62, 0.1, Priority::Medium);
        assert_eq!(
            low.reason_text().as_deref(),
            Some("Low confidence score (0.62) - requires human expertise")
        );

        let risky = router().decide(0.95, 0.45, Priority::High);
        assert_eq!(
            risky.reason_text().as_deref(),
            Some("High risk score (0.45) - requires human oversight")
        );

        let both = router().decide(0.3, 0.9, Priority::Medium);
        assert!(matches!(both.reason, Some(EscalationReason::LowConfidence { .. })));
    }

    #[test]
    fn test_both_marginal_is_complex_issue() {
        let decision = router().decide(0.78, 0.33, Priority::Medium);
        assert_eq!(decision.reason, Some(EscalationReason::ComplexIssue));
        assert_eq!(
            decision.reason_text().as_deref(),
            Some("Complex issue requiring human intervention")
        );
    }

    #[test]
    fn test_non_finite_inputs_escalate() {
        let decision = router().decide(f64::NAN, f64::INFINITY, Priority::Low);
        assert_eq!(decision.path, ResolutionPath::Escalation);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.risk, 1.0);
    }

    #[test]
    fn test_processing_error_reason() {
        let decision = RoutingDecision::processing_error("store offline", Priority::Medium);
        assert_eq!(
            decision.reason_text().as_deref(),
            Some("Processing error: store offline")
        );
    }
}
