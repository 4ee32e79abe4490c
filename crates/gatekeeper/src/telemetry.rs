//! Append-only JSONL log of routing decisions.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use gatekeeper_core::Evaluation;

/// One line of the decision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub timestamp: String,
    pub decision_id: Uuid,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub confidence: f64,
    pub risk: f64,
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// `source:kind` of every degraded call.
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

impl DecisionLogEntry {
    pub fn from_evaluation(evaluation: &Evaluation) -> Self {
        let decision = &evaluation.decision;
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            decision_id: evaluation.decision_id,
            path: decision.path.to_string(),
            reason: decision.reason_text(),
            confidence: decision.confidence,
            risk: decision.risk,
            priority: decision.priority.to_string(),
            category: evaluation
                .audit
                .as_ref()
                .map(|a| a.triage.category.to_string()),
            recommendation: evaluation
                .audit
                .as_ref()
                .map(|a| a.consensus.recommendation.to_string()),
            fallbacks: evaluation
                .fallbacks
                .iter()
                .map(|n| format!("{}:{}", n.source, n.kind))
                .collect(),
        }
    }
}

/// Append `entry` to the log at `path`. Failures are logged, never raised.
pub fn append_decision(entry: &DecisionLogEntry, path: &Path) {
    match serde_json::to_string(entry) {
        Ok(json) => {
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
            {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{json}") {
                        warn!("Failed to append decision log: {e}");
                    } else {
                        info!(
                            path = %path.display(),
                            decision_id = %entry.decision_id,
                            "Appended decision log"
                        );
                    }
                }
                Err(e) => warn!("Failed to open decision log: {e}"),
            }
        }
        Err(e) => warn!("Failed to serialize decision log entry: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_core::{FallbackKind, FallbackNote, Priority, RoutingDecision};

    fn failed_evaluation() -> Evaluation {
        Evaluation {
            decision_id: Uuid::new_v4(),
            decision: RoutingDecision::processing_error("boom", Priority::High),
            audit: None,
            escalation: None,
            fallbacks: vec![FallbackNote::new("embed", FallbackKind::Timeout, "slow")],
        }
    }

    #[test]
    fn test_entry_summarizes_evaluation() {
        let evaluation = failed_evaluation();
        let entry = DecisionLogEntry::from_evaluation(&evaluation);

        assert_eq!(entry.path, "escalation");
        assert_eq!(entry.reason.as_deref(), Some("Processing error: boom"));
        assert_eq!(entry.priority, "high");
        assert_eq!(entry.fallbacks, vec!["embed:timeout".to_string()]);
        assert!(entry.category.is_none());
    }

    #[test]
    fn test_append_writes_one_line_per_decision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");

        for _ in 0..2 {
            append_decision(&DecisionLogEntry::from_evaluation(&failed_evaluation()), &path);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<DecisionLogEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_ne!(lines[0].decision_id, lines[1].decision_id);
    }
}
