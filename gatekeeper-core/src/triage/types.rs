//! Triage categories, their defaults table, and the analysis record.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed support categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PasswordReset,
    TechnicalIssue,
    Configuration,
    IntegrationIssue,
    SecurityConcern,
    GeneralInquiry,
}

/// Coarse label used by the category defaults table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
    Critical,
}

impl Level {
    /// Numeric risk contribution of a label.
    pub fn risk_value(&self) -> f64 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.5,
            Self::High => 0.8,
            Self::Critical => 0.95,
        }
    }
}

/// Per-category defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryProfile {
    pub confidence_boost: f64,
    pub complexity: Level,
    pub risk: Level,
    /// Capability needed on the 1–10 scale.
    pub required_capability: f64,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::PasswordReset,
        Category::TechnicalIssue,
        Category::Configuration,
        Category::IntegrationIssue,
        Category::SecurityConcern,
        Category::GeneralInquiry,
    ];

    pub fn profile(&self) -> CategoryProfile {
        let (confidence_boost, complexity, risk, required_capability) = match self {
            Self::PasswordReset => (0.2, Level::Low, Level::Low, 1.0),
            Self::TechnicalIssue => (0.0, Level::Medium, Level::Medium, 6.0),
            Self::Configuration => (0.1, Level::Medium, Level::Low, 4.0),
            Self::IntegrationIssue => (-0.2, Level::High, Level::High, 8.0),
            Self::SecurityConcern => (-0.3, Level::High, Level::Critical, 9.0),
            Self::GeneralInquiry => (0.15, Level::Low, Level::Low, 2.0),
        };
        CategoryProfile {
            confidence_boost,
            complexity,
            risk,
            required_capability,
        }
    }

    /// Categories simple enough to automate at low complexity.
    pub fn is_routine(&self) -> bool {
        matches!(self, Self::PasswordReset | Self::GeneralInquiry)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PasswordReset => write!(f, "password_reset"),
            Self::TechnicalIssue => write!(f, "technical_issue"),
            Self::Configuration => write!(f, "configuration"),
            Self::IntegrationIssue => write!(f, "integration_issue"),
            Self::SecurityConcern => write!(f, "security_concern"),
            Self::GeneralInquiry => write!(f, "general_inquiry"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Where triage would send the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingHint {
    /// Automated research against the knowledge base.
    Research,
    HumanExpert,
}

/// Fast-pass completion shape.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct FastPassResponse {
    pub primary_category: Category,
    /// Confidence in the categorization, 0.0–1.0.
    pub confidence: f64,
    pub urgency: Urgency,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Deep-pass completion shape.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct DeepPassResponse {
    pub intent: String,
    /// Technical complexity, 1–10.
    pub complexity: f64,
    #[serde(default)]
    pub emotional_state: String,
    #[serde(default)]
    pub expertise_required: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    /// Likelihood of successful automation, 0.0–1.0.
    pub automation_feasibility: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Complete triage result for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageAnalysis {
    pub category: Category,
    /// Intent reported by the deep pass.
    pub subcategory: String,
    pub urgency: Urgency,
    /// 1–10, after the user-level modifier.
    pub complexity: u8,
    pub automation_feasibility: f64,
    pub risk_level: f64,
    /// Mean of fast-pass and contextual confidence.
    pub confidence: f64,
    /// Confidence after category, routing and learning adjustments.
    pub calibrated_confidence: f64,
    pub risk_score: f64,
    pub capability_match: f64,
    pub keywords: Vec<String>,
    pub emotional_state: String,
    pub expertise_required: String,
    pub risk_factors: Vec<String>,
    pub reasoning: String,
    pub routing: RoutingHint,
    pub escalation_hint: Option<String>,
    pub fast_pass_fallback: bool,
    pub deep_pass_fallback: bool,
}

impl TriageAnalysis {
    /// Triage alone considers the request automatable.
    pub fn favors_automation(&self) -> bool {
        self.routing == RoutingHint::Research && self.escalation_hint.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_table() {
        let security = Category::SecurityConcern.profile();
        assert_eq!(security.risk, Level::Critical);
        assert_eq!(security.confidence_boost, -0.3);
        assert_eq!(Category::PasswordReset.profile().required_capability, 1.0);
        assert_eq!(Level::High.risk_value(), 0.8);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let parsed: Result<FastPassResponse, _> = serde_json::from_str(
            r#"{"primary_category":"billing","confidence":0.9,"urgency":"low"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_category_display_matches_serde() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
    }
}
