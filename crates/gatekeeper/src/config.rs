use std::time::Duration;

/// OpenAI-compatible endpoint serving both completions and embeddings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL up to and including `/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model for the fast triage pass.
    pub fast_model: String,
    /// Model for the deep triage pass.
    pub deep_model: String,
    pub embed_model: String,
    /// Length of the vectors `embed_model` returns.
    pub embed_dimensions: usize,
    /// Transport-level timeout. The engine applies its own per-call timeout on top.
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("GATEKEEPER_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8080/v1".into()),
            api_key: std::env::var("GATEKEEPER_LLM_API_KEY").ok(),
            fast_model: std::env::var("GATEKEEPER_FAST_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".into()),
            deep_model: std::env::var("GATEKEEPER_DEEP_MODEL")
                .unwrap_or_else(|_| "gpt-4o".into()),
            embed_model: std::env::var("GATEKEEPER_EMBED_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".into()),
            embed_dimensions: std::env::var("GATEKEEPER_EMBED_DIMENSIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1536),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ServiceConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// `{base_url}/{path}` with exactly one slash between them.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_with_single_slash() {
        let config = ServiceConfig::default().with_base_url("http://llm:8080/v1/");
        assert_eq!(
            config.endpoint("/chat/completions"),
            "http://llm:8080/v1/chat/completions"
        );
        assert_eq!(config.endpoint("embeddings"), "http://llm:8080/v1/embeddings");
    }

    #[test]
    fn test_overrides_replace_env_defaults() {
        let config = ServiceConfig::default()
            .with_base_url("http://proxy/v1")
            .with_api_key("sk-test");
        assert_eq!(config.base_url, "http://proxy/v1");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    }
}
