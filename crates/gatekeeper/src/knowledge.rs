//! Knowledge file loading.
//!
//! The file is a JSON array of items. Items without an `embedding` are
//! embedded at load time; an item whose embedding fails is kept with a zero
//! vector so it can still match on words and keywords.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use gatekeeper_core::{EmbeddingService, KnowledgeItem, SimilarityIndex};

#[derive(Debug, Deserialize)]
struct KnowledgeEntry {
    id: String,
    #[serde(default)]
    title: String,
    content: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

pub async fn load_index(path: &Path, embedder: &dyn EmbeddingService) -> Result<SimilarityIndex> {
    if !path.exists() {
        warn!(path = %path.display(), "Knowledge file not found, starting with an empty index");
        return Ok(SimilarityIndex::new());
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read knowledge file {}", path.display()))?;
    let entries: Vec<KnowledgeEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse knowledge file {}", path.display()))?;

    let mut index = SimilarityIndex::new();
    let mut embedded = 0usize;
    for entry in entries {
        let embedding = match entry.embedding {
            Some(embedding) => embedding,
            None => {
                embedded += 1;
                match embedder.embed(&entry.content).await {
                    Ok(embedding) => embedding,
                    Err(e) => {
                        warn!(item = %entry.id, error = %e, "Embedding failed, using zero vector");
                        vec![0.0; embedder.dimensions()]
                    }
                }
            }
        };

        let mut item = KnowledgeItem::new(entry.id, entry.content, embedding)
            .with_title(entry.title)
            .with_keywords(entry.keywords);
        if let Some(category) = entry.category {
            item = item.with_category(category);
        }
        index.insert(item);
    }

    info!(
        path = %path.display(),
        items = index.len(),
        embedded,
        "Loaded knowledge index"
    );
    Ok(index)
}
