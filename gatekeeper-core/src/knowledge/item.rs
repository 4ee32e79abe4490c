use serde::{Deserialize, Serialize};

use crate::text;

/// Shape of solution a knowledge item describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionType {
    Procedural,
    Troubleshooting,
    Configuration,
    Informational,
    General,
}

impl SolutionType {
    /// Classify by the first matching keyword family, in declaration order.
    pub fn classify(content: &str) -> Self {
        const FAMILIES: &[(SolutionType, &[&str])] = &[
            (SolutionType::Procedural, &["step", "procedure", "guide"]),
            (
                SolutionType::Troubleshooting,
                &["troubleshoot", "problem", "issue", "error"],
            ),
            (
                SolutionType::Configuration,
                &["configure", "setup", "install"],
            ),
            (
                SolutionType::Informational,
                &["explain", "what is", "definition"],
            ),
        ];

        let lowered = content.to_lowercase();
        FAMILIES
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| lowered.contains(n)))
            .map(|(kind, _)| *kind)
            .unwrap_or(SolutionType::General)
    }
}

impl std::fmt::Display for SolutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Procedural => write!(f, "procedural"),
            Self::Troubleshooting => write!(f, "troubleshooting"),
            Self::Configuration => write!(f, "configuration"),
            Self::Informational => write!(f, "informational"),
            Self::General => write!(f, "general"),
        }
    }
}

const COMPLEXITY_WORDS: &[&str] = &["advanced", "complex", "difficult", "expert"];

/// Metadata derived from item content at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub word_count: usize,
    pub has_steps: bool,
    pub solution_type: SolutionType,
    /// Occurrences of words that mark expert-level material.
    pub complexity_indicators: usize,
}

impl ItemMetadata {
    pub fn derive(content: &str) -> Self {
        let words = text::words(content);
        let has_steps = words.iter().any(|w| w == "step" || w == "steps")
            || content.lines().any(|line| {
                let line = line.trim_start();
                let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
                digits > 0 && matches!(line[digits..].chars().next(), Some('.') | Some(')'))
            });

        Self {
            word_count: words.len(),
            has_steps,
            solution_type: SolutionType::classify(content),
            complexity_indicators: text::count_terms(&words, COMPLEXITY_WORDS),
        }
    }
}

/// One knowledge-base entry with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Knowledge-base category label, free text.
    pub category: String,
    /// Lower-cased keywords.
    pub keywords: Vec<String>,
    pub embedding: Vec<f32>,
    pub metadata: ItemMetadata,
}

impl KnowledgeItem {
    pub fn new(id: impl Into<String>, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        let content = content.into();
        let metadata = ItemMetadata::derive(&content);
        Self {
            id: id.into(),
            title: String::new(),
            content,
            category: "general".to_string(),
            keywords: Vec::new(),
            embedding,
            metadata,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }
}
