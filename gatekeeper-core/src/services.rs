//! Narrow interfaces to the remote embedding and completion capabilities.
//!
//! Implementations live outside the core (the CLI ships an HTTP client).
//! The engine wraps every call in a timeout and a documented fallback, so
//! implementations only need to report failures honestly.

use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Failure of a single external call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Which model class a completion should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheap, low-latency classification.
    Fast,
    /// Slower, more thorough analysis.
    Deep,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

/// One structured completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub tier: ModelTier,
    pub temperature: f32,
    pub max_tokens: u32,
    /// JSON Schema the response object must satisfy.
    pub response_schema: serde_json::Value,
}

impl CompletionRequest {
    /// Build a request whose response shape is the JSON Schema of `T`.
    pub fn structured<T: JsonSchema>(prompt: String, tier: ModelTier) -> Self {
        let schema = schemars::schema_for!(T);
        Self {
            prompt,
            tier,
            temperature: 0.1,
            max_tokens: 500,
            response_schema: serde_json::to_value(schema).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Length of every vector this service returns.
    fn dimensions(&self) -> usize;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Raw completion text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}

static JSON_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("JSON_FENCE_RE regex should compile")
});

/// Locate the JSON object in a completion: a fenced block if present,
/// otherwise the outermost braces.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    if let Some(caps) = JSON_FENCE_RE.captures(raw) {
        return caps.get(1).map(|m| m.as_str());
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Parse a completion into `T`, reporting unusable text as `Malformed`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ServiceError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| ServiceError::Malformed("no JSON object in completion".into()))?;
    serde_json::from_str(json).map_err(|e| ServiceError::Malformed(e.to_string()))
}

/// Complete `request` and parse the result as `T`.
pub async fn complete_structured<T: DeserializeOwned>(
    service: &dyn CompletionService,
    request: &CompletionRequest,
) -> Result<T, ServiceError> {
    let raw = service.complete(request).await?;
    parse_structured(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Labelled {
        label: String,
        score: f64,
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "Sure!\n```json\n{\"label\": \"ok\", \"score\": 0.5}\n```\nanything else";
        let labelled: Labelled = parse_structured(raw).unwrap();
        assert_eq!(
            labelled,
            Labelled {
                label: "ok".into(),
                score: 0.5
            }
        );
    }

    #[test]
    fn test_parse_bare_json_with_prose() {
        let raw = "Result: {\"label\": \"x\", \"score\": 1} done";
        let labelled: Labelled = parse_structured(raw).unwrap();
        assert_eq!(labelled.label, "x");
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        let err = parse_structured::<Labelled>("no object here").unwrap_err();
        assert!(matches!(err, ServiceError::Malformed(_)));
        let err = parse_structured::<Labelled>("{\"label\": 3}").unwrap_err();
        assert!(matches!(err, ServiceError::Malformed(_)));
    }

    #[test]
    fn test_structured_request_carries_schema() {
        let request = CompletionRequest::structured::<Labelled>("hi".into(), ModelTier::Fast);
        let props = &request.response_schema["properties"];
        assert!(props.get("label").is_some());
        assert!(props.get("score").is_some());
        assert_eq!(request.max_tokens, 500);
    }
}
