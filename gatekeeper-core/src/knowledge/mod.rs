//! Knowledge items and nearest-match search.
//!
//! Items are ingested by an external knowledge-base collaborator and are
//! immutable here. The index recomputes matches on every call:
//!
//! | Component | Weight | Signal |
//! |-----------|--------|--------|
//! | cosine    | 0.6    | query embedding vs item embedding |
//! | jaccard   | 0.3    | query words vs item content words |
//! | keywords  | 0.1    | share of item keywords present in the query |

pub mod index;
pub mod item;

pub use index::{cosine, MatchBreakdown, SimilarityIndex, SimilarityMatch};
pub use item::{ItemMetadata, KnowledgeItem, SolutionType};
