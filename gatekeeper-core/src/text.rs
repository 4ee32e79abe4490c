//! Word-level text helpers shared by similarity, scoring and triage.

use std::collections::HashSet;

/// Lower-cased words with surrounding punctuation trimmed, empties dropped.
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

pub fn word_set(text: &str) -> HashSet<String> {
    words(text).into_iter().collect()
}

/// |A ∩ B| / |A ∪ B| over word sets; 0 when both are empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Number of occurrences of any of `terms` among `words`.
pub fn count_terms(words: &[String], terms: &[&str]) -> usize {
    words.iter().filter(|w| terms.contains(&w.as_str())).count()
}

/// First `n` words of `text`, used as fallback keywords.
pub fn leading_words(text: &str, n: usize) -> Vec<String> {
    words(text).into_iter().take(n).collect()
}
