/// Signals combined into the routing risk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskInputs {
    pub triage_risk: f64,
    pub scorer_confidence: f64,
    /// 1 minus the complexity factor.
    pub research_complexity: f64,
    pub consensus_strength: f64,
}

/// Agents disagreeing below this strength adds a risk penalty.
const WEAK_CONSENSUS: f64 = 0.6;
const DISAGREEMENT_PENALTY: f64 = 0.2;

/// `0.4·triage + 0.4·(1 − confidence) + 0.2·complexity`, plus a penalty for
/// weak consensus, clamped to [0, 1].
pub fn combined_risk(inputs: RiskInputs) -> f64 {
    let mut risk = inputs.triage_risk * 0.4
        + (1.0 - inputs.scorer_confidence) * 0.4
        + inputs.research_complexity * 0.2;
    if inputs.consensus_strength < WEAK_CONSENSUS {
        risk += DISAGREEMENT_PENALTY;
    }
    if risk.is_finite() {
        risk.clamp(0.0, 1.0)
    } else {
        1.0
    }
}
