//! Caller-supplied request context: who is asking, how urgently, on what.

use serde::{Deserialize, Serialize};

use crate::text;

/// Declared experience of the requesting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl UserLevel {
    /// Capability on the 1–10 category complexity scale.
    pub fn capability(&self) -> f64 {
        match self {
            Self::Beginner => 3.0,
            Self::Intermediate => 6.0,
            Self::Advanced => 9.0,
        }
    }
}

impl std::fmt::Display for UserLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// Ticket priority. Ordered so that `Critical` is the maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

const CRITICAL_TERMS: &[&str] = &["critical", "emergency", "down", "outage"];
const CRITICAL_PHRASES: &[&str] = &["security breach"];
const HIGH_TERMS: &[&str] = &["urgent", "asap", "blocking", "production"];

impl Priority {
    /// Infer a priority from message wording when the caller gave none.
    pub fn infer_from_message(message: &str) -> Self {
        let words = text::words(message);
        let lowered = message.to_lowercase();

        if text::count_terms(&words, CRITICAL_TERMS) > 0
            || CRITICAL_PHRASES.iter().any(|p| lowered.contains(p))
        {
            Self::Critical
        } else if text::count_terms(&words, HIGH_TERMS) > 0 {
            Self::High
        } else {
            Self::Medium
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Context accompanying one support request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub user_level: UserLevel,
    /// Explicit priority; inferred from the message when absent.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Operating system or product the user is on, free text.
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub urgent: bool,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_level(mut self, level: UserLevel) -> Self {
        self.user_level = level;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }

    pub fn effective_priority(&self, message: &str) -> Priority {
        self.priority
            .unwrap_or_else(|| Priority::infer_from_message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_inference() {
        assert_eq!(
            Priority::infer_from_message("Our site is DOWN!"),
            Priority::Critical
        );
        assert_eq!(
            Priority::infer_from_message("Possible security breach on the VPN"),
            Priority::Critical
        );
        assert_eq!(
            Priority::infer_from_message("need this asap please"),
            Priority::High
        );
        assert_eq!(
            Priority::infer_from_message("the download page looks odd"),
            Priority::Medium
        );
    }

    #[test]
    fn test_explicit_priority_wins() {
        let ctx = RequestContext::new().with_priority(Priority::Low);
        assert_eq!(ctx.effective_priority("production outage"), Priority::Low);
    }

    #[test]
    fn test_context_deserializes_with_defaults() {
        let ctx: RequestContext = serde_json::from_str(r#"{"user_level":"advanced"}"#).unwrap();
        assert_eq!(ctx.user_level, UserLevel::Advanced);
        assert_eq!(ctx.priority, None);
        assert!(!ctx.urgent);
    }
}
