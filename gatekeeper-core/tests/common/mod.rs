//! Deterministic collaborators for engine integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use gatekeeper_core::swarm::{AgentError, AgentVerdict, ScoringAgent, SwarmTask};
use gatekeeper_core::{
    AgentType, CompletionRequest, CompletionService, EmbeddingService, Gatekeeper,
    GatekeeperConfig, KnowledgeItem, MemoryStore, ModelTier, PersistenceStore, Recommendation,
    ServiceError, SimilarityIndex,
};

pub const PASSWORD_QUERY: &str = "I forgot my password and need to reset it";

pub const FAST_PASSWORD: &str = r#"{"primary_category":"password_reset","confidence":0.9,"urgency":"low","keywords":["password","reset"]}"#;

pub const DEEP_PASSWORD: &str = r#"```json
{
  "intent": "reset forgotten password",
  "complexity": 2,
  "emotional_state": "calm",
  "expertise_required": "none",
  "risk_factors": [],
  "automation_feasibility": 0.9,
  "reasoning": "self-service flow exists"
}
```"#;

pub fn config() -> GatekeeperConfig {
    GatekeeperConfig::from_toml_str(include_str!("../../../config/gatekeeper.toml"))
        .expect("shipped config parses")
}

/// Returns the same unit vector for every text.
pub struct FixedEmbedder;

#[async_trait]
impl EmbeddingService for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ServiceError> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        3
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingService for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ServiceError> {
        Err(ServiceError::Transport("connection refused".into()))
    }

    fn dimensions(&self) -> usize {
        3
    }
}

/// Canned reply per model tier.
pub struct ScriptedCompleter {
    pub fast: String,
    pub deep: String,
}

impl ScriptedCompleter {
    pub fn password() -> Self {
        Self {
            fast: FAST_PASSWORD.to_string(),
            deep: DEEP_PASSWORD.to_string(),
        }
    }
}

#[async_trait]
impl CompletionService for ScriptedCompleter {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        Ok(match request.tier {
            ModelTier::Fast => self.fast.clone(),
            ModelTier::Deep => self.deep.clone(),
        })
    }
}

pub struct FailingCompleter;

#[async_trait]
impl CompletionService for FailingCompleter {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ServiceError> {
        Err(ServiceError::Status {
            status: 503,
            body: "overloaded".into(),
        })
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledCompleter;

#[async_trait]
impl CompletionService for StalledCompleter {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ServiceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ServiceError::Transport("unreachable".into()))
    }
}

/// Agent with a fixed verdict, or a fixed failure.
pub struct FixedAgent {
    pub agent_type: AgentType,
    pub verdict: Option<(f64, Recommendation)>,
}

#[async_trait]
impl ScoringAgent for FixedAgent {
    fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    async fn evaluate(&self, _task: &SwarmTask) -> Result<AgentVerdict, AgentError> {
        match self.verdict {
            Some((confidence, recommendation)) => Ok(AgentVerdict {
                confidence,
                recommendation,
                payload: serde_json::Value::Null,
            }),
            None => Err(AgentError::Failed("stub failure".into())),
        }
    }
}

pub fn password_item() -> KnowledgeItem {
    KnowledgeItem::new(
        "kb-password",
        "Password reset guide: step 1 open the login page and click forgot password. \
         Step 2 follow the emailed link to reset it.",
        vec![1.0, 0.0, 0.0],
    )
    .with_title("Reset a forgotten password")
    .with_category("account")
    .with_keywords(["password", "reset", "login", "forgot"])
}

pub fn vpn_item() -> KnowledgeItem {
    KnowledgeItem::new(
        "kb-vpn",
        "Configure the VPN client using the corporate profile.",
        vec![0.0, 0.2, 0.9],
    )
    .with_category("network")
    .with_keywords(["vpn", "network"])
}

pub fn index() -> SimilarityIndex {
    SimilarityIndex::from_items([password_item(), vpn_item()])
}

pub fn engine_with(
    embedder: Arc<dyn EmbeddingService>,
    completer: Arc<dyn CompletionService>,
    store: Arc<dyn PersistenceStore>,
) -> Gatekeeper {
    Gatekeeper::new(config(), embedder, completer, index(), store).expect("valid engine")
}

/// Healthy services over a fresh in-memory store.
pub fn healthy_engine() -> (Gatekeeper, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(
        Arc::new(FixedEmbedder),
        Arc::new(ScriptedCompleter::password()),
        store.clone(),
    );
    (engine, store)
}

/// Replace every built-in agent with one fixed verdict.
pub fn with_unanimous_agents(
    engine: Gatekeeper,
    verdict: Option<(f64, Recommendation)>,
) -> Gatekeeper {
    AgentType::ALL.iter().fold(engine, |engine, agent_type| {
        engine.with_agent(Arc::new(FixedAgent {
            agent_type: *agent_type,
            verdict,
        }))
    })
}
