//! OpenAI-compatible HTTP client for the engine's completion and embedding
//! services.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use gatekeeper_core::{
    CompletionRequest, CompletionService, EmbeddingService, ModelTier, ServiceError,
};

use crate::config::ServiceConfig;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    config: ServiceConfig,
}

impl OpenAiClient {
    pub fn new(config: ServiceConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(config.request_timeout)
                .build()?,
            config,
        })
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.config.fast_model,
            ModelTier::Deep => &self.config.deep_model,
        }
    }

    fn chat_request(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if !request.response_schema.is_null() {
            messages.push(ChatMessage {
                role: "system",
                content: format!(
                    "Respond with a single JSON object matching this JSON Schema:\n{}",
                    request.response_schema
                ),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: self.model_for(request.tier).to_string(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ServiceError> {
        let mut builder = self.http.post(self.config.endpoint(path)).json(body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("Failed to parse response: {e}")))
    }

    fn transport_error(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout(self.config.request_timeout)
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

fn first_content(response: ChatResponse) -> Result<String, ServiceError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ServiceError::Malformed("No content in completion response".into()))
}

fn first_embedding(
    response: EmbeddingResponse,
    dimensions: usize,
) -> Result<Vec<f32>, ServiceError> {
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| ServiceError::Malformed("No embedding in response".into()))?;
    if embedding.len() != dimensions {
        return Err(ServiceError::Malformed(format!(
            "Expected {dimensions} dimensions, got {}",
            embedding.len()
        )));
    }
    Ok(embedding)
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let body = self.chat_request(request);
        debug!(model = %body.model, tier = %request.tier, "Requesting completion");
        let response: ChatResponse = self.post("chat/completions", &body).await?;
        first_content(response)
    }
}

#[async_trait]
impl EmbeddingService for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let body = EmbeddingRequest {
            model: &self.config.embed_model,
            input: text,
        };
        let response: EmbeddingResponse = self.post("embeddings", &body).await?;
        first_embedding(response, self.config.embed_dimensions)
    }

    fn dimensions(&self) -> usize {
        self.config.embed_dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_core::triage::types::FastPassResponse;

    fn client() -> OpenAiClient {
        let mut config = ServiceConfig::default();
        config.fast_model = "small".into();
        config.deep_model = "large".into();
        OpenAiClient::new(config).unwrap()
    }

    #[test]
    fn test_chat_request_routes_by_tier_and_carries_schema() {
        let client = client();
        let request = CompletionRequest::structured::<FastPassResponse>(
            "classify this".into(),
            ModelTier::Deep,
        );
        let body = client.chat_request(&request);

        assert_eq!(body.model, "large");
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "system");
        assert!(body.messages[0].content.contains("primary_category"));
        assert_eq!(body.messages[1].content, "classify this");
    }

    #[test]
    fn test_first_content_requires_text() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"{\"a\":1}"}}]}"#).unwrap();
        assert_eq!(first_content(response).unwrap(), r#"{"a":1}"#);

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_content(empty), Err(ServiceError::Malformed(_))));
    }

    #[test]
    fn test_first_embedding_checks_dimensions() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#).unwrap();
        assert_eq!(first_embedding(response, 3).unwrap().len(), 3);

        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1,0.2]}]}"#).unwrap();
        assert!(matches!(
            first_embedding(response, 3),
            Err(ServiceError::Malformed(_))
        ));
    }
}
