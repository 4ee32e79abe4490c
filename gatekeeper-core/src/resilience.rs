//! Resilience: degraded results for external service failures
//!
//! Embedding and completion calls never abort a request. A failed or
//! malformed call resolves to the caller's documented default, wrapped so
//! the decision can report which values were degraded.
//!
//! ```text
//! service call
//!   ├─ succeeds                → Outcome::Served(value)
//!   ├─ fails / times out       → Outcome::Fallback { value: default, kind: Transient | Timeout }
//!   └─ unparseable response    → Outcome::Fallback { value: default, kind: Malformed }
//! ```
//!
//! Hard errors (bad config, invalid input, cancellation) never pass through
//! here; they stay in `Result::Err` on the engine API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::services::ServiceError;

/// Why a fallback value was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    /// Transport or upstream failure.
    Transient,
    /// The call exceeded its timeout.
    Timeout,
    /// The service answered but the response did not parse.
    Malformed,
}

impl std::fmt::Display for FallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Timeout => write!(f, "timeout"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

impl From<&ServiceError> for FallbackKind {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::Timeout(_) => Self::Timeout,
            ServiceError::Malformed(_) => Self::Malformed,
            ServiceError::Transport(_) | ServiceError::Status { .. } => Self::Transient,
        }
    }
}

/// Marker attached to a decision for each degraded value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackNote {
    /// Which call degraded, e.g. `embed` or `triage.fast_pass`.
    pub source: String,
    pub kind: FallbackKind,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl FallbackNote {
    pub fn new(source: &str, kind: FallbackKind, detail: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            kind,
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn from_error(source: &str, err: &ServiceError) -> Self {
        Self::new(source, FallbackKind::from(err), err.to_string())
    }
}

/// A value that was either served by its source or substituted.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Served(T),
    Fallback { value: T, note: FallbackNote },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Served(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn note(&self) -> Option<&FallbackNote> {
        match self {
            Self::Served(_) => None,
            Self::Fallback { note, .. } => Some(note),
        }
    }

    pub fn into_parts(self) -> (T, Option<FallbackNote>) {
        match self {
            Self::Served(value) => (value, None),
            Self::Fallback { value, note } => (value, Some(note)),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Served(value) => Outcome::Served(f(value)),
            Self::Fallback { value, note } => Outcome::Fallback {
                value: f(value),
                note,
            },
        }
    }
}

/// Run `call` under `timeout`, substituting `fallback()` on any failure.
pub async fn with_fallback<T, F, D>(
    source: &str,
    timeout: Duration,
    call: F,
    fallback: D,
) -> Outcome<T>
where
    F: Future<Output = Result<T, ServiceError>>,
    D: FnOnce() -> T,
{
    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(timeout)),
    };

    match result {
        Ok(value) => Outcome::Served(value),
        Err(err) => {
            let note = FallbackNote::from_error(source, &err);
            warn!(
                source,
                kind = %note.kind,
                error = %err,
                "External call degraded, using fallback"
            );
            Outcome::Fallback {
                value: fallback(),
                note,
            }
        }
    }
}
