//! Named confidence factors and the fixed formulas that produce them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::context::{Priority, UserLevel};
use crate::knowledge::{SimilarityMatch, SolutionType};
use crate::text;

/// Every signal the scorer can weigh. Configuration keys use these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Similarity,
    Consensus,
    Complexity,
    Quality,
    Diversity,
    UserExperience,
    PriorityImpact,
    SystemContext,
    TimePressure,
    HistoricalAccuracy,
    PatternStrength,
}

impl Factor {
    pub const ALL: [Factor; 11] = [
        Factor::Similarity,
        Factor::Consensus,
        Factor::Complexity,
        Factor::Quality,
        Factor::Diversity,
        Factor::UserExperience,
        Factor::PriorityImpact,
        Factor::SystemContext,
        Factor::TimePressure,
        Factor::HistoricalAccuracy,
        Factor::PatternStrength,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Similarity => "similarity",
            Self::Consensus => "consensus",
            Self::Complexity => "complexity",
            Self::Quality => "quality",
            Self::Diversity => "diversity",
            Self::UserExperience => "user_experience",
            Self::PriorityImpact => "priority_impact",
            Self::SystemContext => "system_context",
            Self::TimePressure => "time_pressure",
            Self::HistoricalAccuracy => "historical_accuracy",
            Self::PatternStrength => "pattern_strength",
        }
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Factor values for one request. Every stored value is in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfidenceFactors(BTreeMap<Factor, f64>);

impl ConfidenceFactors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` clamped to [0, 1]; non-finite values store as 0.
    pub fn insert(&mut self, factor: Factor, value: f64) {
        let value = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.0.insert(factor, value);
    }

    pub fn with(mut self, factor: Factor, value: f64) -> Self {
        self.insert(factor, value);
        self
    }

    pub fn get(&self, factor: Factor) -> Option<f64> {
        self.0.get(&factor).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

const GOOD_MATCH: f64 = 0.6;
const TECHNICAL_TERMS: &[&str] = &["api", "integration", "configuration", "database", "server"];
const UNCERTAINTY_WORDS: &[&str] = &["somehow", "maybe", "unclear", "confusing"];
const KNOWN_SYSTEMS: &[&str] = &["windows", "mac", "linux", "android", "ios"];

/// Best match score, 0 with no matches.
pub fn similarity(matches: &[SimilarityMatch]) -> f64 {
    matches.first().map(|m| m.score).unwrap_or(0.0)
}

/// How many of the top ten matches are good, saturating at five.
pub fn consensus(matches: &[SimilarityMatch]) -> f64 {
    let good = matches.iter().take(10).filter(|m| m.score > GOOD_MATCH).count();
    (good as f64 / 5.0).min(1.0)
}

/// Inverse linguistic complexity of the request text.
pub fn complexity(request_text: &str) -> f64 {
    let words = text::words(request_text);
    let present = |terms: &[&str]| terms.iter().filter(|t| words.iter().any(|w| w == *t)).count();

    let length = words.len() as f64 / 20.0;
    let technical = present(TECHNICAL_TERMS) as f64 / 5.0;
    let uncertainty = present(UNCERTAINTY_WORDS) as f64 / 4.0;
    let issues = request_text
        .split('.')
        .filter(|s| !s.trim().is_empty())
        .count() as f64
        / 3.0;

    let avg = (length + technical + uncertainty + issues) / 4.0;
    1.0 - avg.min(1.0)
}

/// Mean adjusted quality of the top five matches.
pub fn quality(matches: &[SimilarityMatch]) -> f64 {
    let top: Vec<_> = matches.iter().take(5).collect();
    if top.is_empty() {
        return 0.0;
    }

    let total: f64 = top
        .iter()
        .map(|m| {
            let meta = &m.item.metadata;
            let mut q = m.score;
            if meta.solution_type == SolutionType::Procedural {
                q += 0.1;
            }
            if meta.word_count > 100 {
                q += 0.05;
            }
            if meta.complexity_indicators > 2 {
                q -= 0.1;
            }
            q.clamp(0.0, 1.0)
        })
        .sum();
    total / top.len() as f64
}

/// Spread of solution types and categories across the top five matches.
pub fn diversity(matches: &[SimilarityMatch]) -> f64 {
    let top: Vec<_> = matches.iter().take(5).collect();
    if top.is_empty() {
        return 0.0;
    }

    let types: HashSet<SolutionType> = top.iter().map(|m| m.item.metadata.solution_type).collect();
    let categories: HashSet<&str> = top.iter().map(|m| m.item.category.as_str()).collect();
    let n = top.len() as f64;
    (types.len() as f64 / n + categories.len() as f64 / n) / 2.0
}

pub fn user_experience(level: UserLevel) -> f64 {
    match level {
        UserLevel::Beginner => 0.7,
        UserLevel::Intermediate => 1.0,
        UserLevel::Advanced => 1.2,
    }
}

pub fn priority_impact(priority: Priority) -> f64 {
    match priority {
        Priority::Low => 1.1,
        Priority::Medium => 1.0,
        Priority::High => 0.9,
        Priority::Critical => 0.8,
    }
}

pub fn system_context(system: Option<&str>) -> f64 {
    let system = match system.map(str::trim) {
        None | Some("") => return 0.8,
        Some(s) if s.eq_ignore_ascii_case("unknown") => return 0.8,
        Some(s) => s.to_lowercase(),
    };
    if KNOWN_SYSTEMS.iter().any(|known| system.contains(known)) {
        1.0
    } else {
        0.9
    }
}

pub fn time_pressure(urgent: bool) -> f64 {
    if urgent {
        0.9
    } else {
        1.0
    }
}

/// A past prediction with its outcome, as seen by the historical factors.
#[derive(Debug, Clone, Copy)]
pub struct PastPrediction<'a> {
    pub words: &'a HashSet<String>,
    pub predicted: f64,
    pub actual: f64,
}

/// `(historical_accuracy, pattern_strength)` over past predictions sharing
/// at least two words with the request.
pub fn historical<'a>(
    request_words: &HashSet<String>,
    past: impl IntoIterator<Item = PastPrediction<'a>>,
) -> (f64, f64) {
    let similar: Vec<_> = past
        .into_iter()
        .filter(|p| p.words.intersection(request_words).count() >= 2)
        .collect();

    if similar.is_empty() {
        return (0.5, 0.0);
    }

    let accurate = similar
        .iter()
        .filter(|p| (p.predicted - p.actual).abs() < 0.2)
        .count();
    let accuracy = accurate as f64 / similar.len() as f64;
    let pattern = (similar.len() as f64 / 10.0).min(1.0);
    (accuracy, pattern)
}
