use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use super::item::KnowledgeItem;
use crate::text;

const COSINE_WEIGHT: f64 = 0.6;
const JACCARD_WEIGHT: f64 = 0.3;
const KEYWORD_WEIGHT: f64 = 0.1;

/// Per-signal contributions to a match score, before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchBreakdown {
    pub cosine: f64,
    pub jaccard: f64,
    pub keyword_overlap: f64,
}

/// One scored knowledge item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatch {
    pub item: Arc<KnowledgeItem>,
    /// Combined score in [0, 1].
    pub score: f64,
    pub breakdown: MatchBreakdown,
}

impl SimilarityMatch {
    pub fn item_id(&self) -> &str {
        &self.item.id
    }
}

/// Cosine similarity. Zero when either vector has zero norm or the
/// dimensions differ.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let value = dot / (norm_a.sqrt() * norm_b.sqrt());
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Share of `keywords` present among the query words.
fn keyword_overlap(query_words: &HashSet<String>, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let hits = keywords.iter().filter(|k| query_words.contains(*k)).count();
    hits as f64 / keywords.len() as f64
}

/// In-memory index over ingested knowledge items.
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    items: Vec<Arc<KnowledgeItem>>,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = KnowledgeItem>) -> Self {
        Self {
            items: items.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn insert(&mut self, item: KnowledgeItem) {
        self.items.push(Arc::new(item));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<KnowledgeItem>> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Score every item against the query, best first. Equal scores keep
    /// ingestion order.
    pub fn match_query(&self, query_embedding: &[f32], query_text: &str) -> Vec<SimilarityMatch> {
        let query_words = text::word_set(query_text);

        let mut matches: Vec<SimilarityMatch> = self
            .items
            .iter()
            .map(|item| {
                let breakdown = MatchBreakdown {
                    cosine: cosine(query_embedding, &item.embedding),
                    jaccard: text::jaccard(&query_words, &text::word_set(&item.content)),
                    keyword_overlap: keyword_overlap(&query_words, &item.keywords),
                };
                let score = COSINE_WEIGHT * breakdown.cosine
                    + JACCARD_WEIGHT * breakdown.jaccard
                    + KEYWORD_WEIGHT * breakdown.keyword_overlap;

                SimilarityMatch {
                    item: Arc::clone(item),
                    score: score.clamp(0.0, 1.0),
                    breakdown,
                }
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password_item() -> KnowledgeItem {
        KnowledgeItem::new(
            "kb-password",
            "Password reset guide: step 1 open the login page and click forgot password. \
             Step 2 follow the emailed link to reset it.",
            vec![0.9, 0.1, 0.0],
        )
        .with_keywords(["password", "reset", "login", "forgot"])
    }

    fn vpn_item() -> KnowledgeItem {
        KnowledgeItem::new(
            "kb-vpn",
            "Configure the VPN client using the corporate profile.",
            vec![0.0, 0.2, 0.9],
        )
        .with_keywords(["vpn", "network"])
    }

    #[test]
    fn test_cosine_properties() {
        let v = [1.0_f32, 2.0, 3.0];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-9);
        assert_eq!(cosine(&v, &[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine(&v, &[1.0, 2.0]), 0.0);
        assert!((cosine(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_password_query_matches_strongly() {
        let index = SimilarityIndex::from_items([vpn_item(), password_item()]);
        let matches = index.match_query(
            &[1.0, 0.0, 0.0],
            "I forgot my password and need to reset it",
        );

        assert_eq!(matches.len(), 2);
        let top = &matches[0];
        assert_eq!(top.item_id(), "kb-password");
        assert!((top.breakdown.keyword_overlap - 0.75).abs() < 1e-12);
        assert!((top.breakdown.jaccard - 6.0 / 21.0).abs() < 1e-12);
        assert!(top.score > 0.6, "score was {}", top.score);
        assert!(matches[1].score < top.score);
    }

    #[test]
    fn test_scores_bounded_and_sorted() {
        let index = SimilarityIndex::from_items([
            vpn_item(),
            password_item(),
            KnowledgeItem::new("kb-empty", "", vec![]),
        ]);
        let matches = index.match_query(&[-1.0, -1.0, -1.0], "vpn network vpn");
        for pair in matches.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for m in &matches {
            assert!((0.0..=1.0).contains(&m.score));
        }
    }

    #[test]
    fn test_ties_keep_ingestion_order() {
        let index = SimilarityIndex::from_items([
            KnowledgeItem::new("a", "alpha", vec![1.0]),
            KnowledgeItem::new("b", "alpha", vec![1.0]),
        ]);
        let ids: Vec<_> = index
            .match_query(&[1.0], "alpha")
            .iter()
            .map(|m| m.item_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_index() {
        assert!(SimilarityIndex::new().match_query(&[1.0], "anything").is_empty());
    }
}
