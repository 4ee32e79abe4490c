//! The gatekeeper engine: one evaluation pipeline plus the feedback path.
//!
//! ```text
//!  request ─► embed ─► SimilarityIndex ─┬─► ConfidenceScorer ─┐
//!                                       └─► TriageClassifier ─┤ (joined)
//!                                                             ▼
//!                                  SwarmConsensus (agents joined)
//!                                                             ▼
//!                             combined risk ─► ResolutionRouter ─► Evaluation
//!
//!  FeedbackRecord ─► decision cache ─► LearningFeedbackLoop
//! ```
//!
//! Degraded external calls never abort an evaluation. They produce a
//! [`FallbackNote`] on the result. Only invalid input and cancellation are
//! surfaced as [`EngineError`]; any other failure inside the pipeline becomes
//! a "Processing error" escalation.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::confidence::{
    ConfidenceAssessment, ConfidenceScorer, PredictionModel, SCORED_HISTORY_CAPACITY,
};
use crate::config::{ConfigError, GatekeeperConfig};
use crate::context::{Priority, RequestContext};
use crate::feedback::{DecisionRecord, FeedbackRecord, LearningFeedbackLoop, LearningReport};
use crate::history::BoundedHistory;
use crate::knowledge::SimilarityIndex;
use crate::persistence::{PersistenceStore, StoreError};
use crate::resilience::{with_fallback, FallbackNote};
use crate::router::{
    combined_risk, EscalationContext, ResolutionRouter, RiskInputs, RoutingDecision,
    RoutingThresholds,
};
use crate::services::{CompletionService, EmbeddingService};
use crate::swarm::{
    builtin, AgentPerformanceRecord, AgentPerformanceTable, AgentType, ConsensusResult,
    ResearchAgent, ScoringAgent, SwarmConsensus, SwarmInsights, SwarmTask,
};
use crate::triage::{TriageAnalysis, TriageClassifier};

/// Decisions kept in memory so feedback can find them.
pub const DECISION_CACHE_CAPACITY: usize = 2000;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Evaluation cancelled")]
    Cancelled,

    #[error("Unknown decision {0}")]
    UnknownDecision(Uuid),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),
}

/// Intermediate results behind a routing decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationAudit {
    pub assessment: ConfidenceAssessment,
    pub triage: TriageAnalysis,
    pub consensus: ConsensusResult,
    pub combined_risk: f64,
}

/// Result of one `evaluate` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub decision_id: Uuid,
    pub decision: RoutingDecision,
    /// Absent when the pipeline failed and produced a processing-error decision.
    pub audit: Option<EvaluationAudit>,
    pub escalation: Option<EscalationContext>,
    pub fallbacks: Vec<FallbackNote>,
}

impl Evaluation {
    pub fn used_fallback(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

/// What `restore` loaded from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub model_restored: bool,
    pub agent_records: usize,
    pub decisions: usize,
    pub rated_decisions: usize,
}

/// Observability snapshot across the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInsights {
    pub swarm: SwarmInsights,
    pub model: PredictionModel,
    pub model_accuracy: Option<f64>,
    pub cached_decisions: usize,
}

pub struct Gatekeeper {
    config: GatekeeperConfig,
    embedder: Arc<dyn EmbeddingService>,
    index: SimilarityIndex,
    scorer: Arc<ConfidenceScorer>,
    triage: Arc<TriageClassifier>,
    swarm: SwarmConsensus,
    router: ResolutionRouter,
    learning: LearningFeedbackLoop,
    store: Arc<dyn PersistenceStore>,
    decisions: RwLock<BoundedHistory<DecisionRecord>>,
}

impl Gatekeeper {
    /// Build an engine with the built-in agent for every configured type.
    pub fn new(
        config: GatekeeperConfig,
        embedder: Arc<dyn EmbeddingService>,
        completer: Arc<dyn CompletionService>,
        index: SimilarityIndex,
        store: Arc<dyn PersistenceStore>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let scorer = Arc::new(ConfidenceScorer::new(&config.scoring));
        let triage = Arc::new(TriageClassifier::new(completer, config.service_timeout()));
        let performance = Arc::new(AgentPerformanceTable::new(config.swarm.agent_learning_rate));
        let swarm = config.swarm.agents.iter().fold(
            SwarmConsensus::new(
                Arc::clone(&performance),
                config.agent_timeout(),
                config.swarm.consensus_threshold,
            ),
            |swarm, agent| swarm.with_agent(builtin(*agent)),
        );
        let router = ResolutionRouter::new(RoutingThresholds::from(&config.routing));
        let learning = LearningFeedbackLoop::new(
            Arc::clone(&scorer),
            performance,
            Arc::clone(&triage),
            Arc::clone(&store),
        );

        info!(
            knowledge_items = index.len(),
            agents = ?config.swarm.agents,
            confidence_threshold = config.routing.confidence_threshold,
            risk_threshold = config.routing.risk_threshold,
            "Gatekeeper engine initialized"
        );

        Ok(Self {
            config,
            embedder,
            index,
            scorer,
            triage,
            swarm,
            router,
            learning,
            store,
            decisions: RwLock::new(BoundedHistory::new(DECISION_CACHE_CAPACITY)),
        })
    }

    /// Replace the agent registered for `agent.agent_type()`.
    pub fn with_agent(mut self, agent: Arc<dyn ScoringAgent>) -> Self {
        self.swarm = self.swarm.with_agent(agent);
        self
    }

    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Load learned state from the store. Call once before serving.
    pub async fn restore(&self) -> Result<RestoreSummary, EngineError> {
        let mut summary = RestoreSummary::default();

        if let Some(model) = self.store.load_prediction_model().await? {
            self.scorer.restore_model(model).await;
            summary.model_restored = true;
        }

        let agents = self.store.load_agent_performance().await?;
        summary.agent_records = agents.len();
        self.swarm.performance().restore(agents).await;

        let history = self.store.load_recent_history(SCORED_HISTORY_CAPACITY).await?;
        summary.decisions = history.len();
        let mut scored = Vec::with_capacity(history.len());
        let mut decisions = Vec::with_capacity(history.len());
        for entry in history {
            if let Some(feedback) = &entry.feedback {
                summary.rated_decisions += 1;
                if let Some(category) = entry.decision.triage_category {
                    self.triage
                        .record_outcome(category, feedback.outcome.is_success())
                        .await;
                }
            }
            scored.push(entry.decision.to_scored(entry.feedback.as_ref()));
            decisions.push(entry.decision);
        }
        self.scorer.restore_history(scored).await;
        self.decisions.write().await.extend(decisions);

        info!(
            model_restored = summary.model_restored,
            agent_records = summary.agent_records,
            decisions = summary.decisions,
            rated = summary.rated_decisions,
            "Restored learned state"
        );
        Ok(summary)
    }

    /// Evaluate one request. Never fails for degraded services.
    pub async fn evaluate(
        &self,
        request_text: &str,
        context: &RequestContext,
    ) -> Result<Evaluation, EngineError> {
        if request_text.trim().is_empty() {
            return Err(EngineError::Validation(
                "request text must not be empty".to_string(),
            ));
        }

        let decision_id = Uuid::new_v4();
        let priority = context.effective_priority(request_text);

        match self
            .run_pipeline(decision_id, request_text, context, priority)
            .await
        {
            Ok(evaluation) => Ok(evaluation),
            Err(err) => {
                error!(%decision_id, error = %err, "Evaluation pipeline failed, escalating");
                Ok(Evaluation {
                    decision_id,
                    decision: RoutingDecision::processing_error(err.to_string(), priority),
                    audit: None,
                    escalation: None,
                    fallbacks: Vec::new(),
                })
            }
        }
    }

    /// `evaluate`, abandoned as a whole when `cancel` fires.
    pub async fn evaluate_with_cancel(
        &self,
        request_text: &str,
        context: &RequestContext,
        cancel: &CancellationToken,
    ) -> Result<Evaluation, EngineError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Evaluation cancelled by caller");
                Err(EngineError::Cancelled)
            }
            result = self.evaluate(request_text, context) => result,
        }
    }

    async fn run_pipeline(
        &self,
        decision_id: Uuid,
        request_text: &str,
        context: &RequestContext,
        priority: Priority,
    ) -> Result<Evaluation, StoreError> {
        let mut fallbacks = Vec::new();

        let dimensions = self.embedder.dimensions();
        let (embedding, note) = with_fallback(
            "embed",
            self.config.service_timeout(),
            self.embedder.embed(request_text),
            || vec![0.0; dimensions],
        )
        .await
        .into_parts();
        fallbacks.extend(note);

        let matches = self.index.match_query(&embedding, request_text);
        debug!(
            %decision_id,
            matches = matches.len(),
            best = matches.first().map(|m| m.score).unwrap_or(0.0),
            "Knowledge matched"
        );

        let (assessment, (triage, triage_notes)) = tokio::join!(
            self.scorer
                .score(decision_id, request_text, context, priority, &matches),
            self.triage.classify(request_text, context, priority),
        );
        fallbacks.extend(triage_notes);

        let task = Arc::new(SwarmTask {
            decision_id,
            request_text: request_text.to_string(),
            priority,
            assessment,
            triage,
            confidence_threshold: self.config.routing.confidence_threshold,
        });
        let consensus = self
            .swarm
            .coordinate(Arc::clone(&task), &self.config.swarm.agents)
            .await;

        let risk = combined_risk(RiskInputs {
            triage_risk: task.triage.risk_score,
            scorer_confidence: task.assessment.score,
            research_complexity: ResearchAgent::research_complexity(&task.assessment),
            consensus_strength: consensus.consensus_strength,
        });
        let decision = self.router.decide(consensus.confidence, risk, priority);
        let escalation =
            EscalationContext::build(&decision, &task.assessment, &task.triage, &consensus);

        let record = DecisionRecord::new(
            decision_id,
            request_text,
            task.assessment.factors.clone(),
            task.assessment.score,
            decision.path,
        )
        .with_triage_category(task.triage.category)
        .with_consensus(&consensus);
        self.store.save_decision(&record).await?;
        self.decisions.write().await.push(record);

        info!(
            %decision_id,
            path = %decision.path,
            confidence = decision.confidence,
            risk = decision.risk,
            priority = %priority,
            fallbacks = fallbacks.len(),
            "Request evaluated"
        );

        let task = Arc::try_unwrap(task).unwrap_or_else(|shared| (*shared).clone());
        Ok(Evaluation {
            decision_id,
            decision,
            audit: Some(EvaluationAudit {
                assessment: task.assessment,
                triage: task.triage,
                consensus,
                combined_risk: risk,
            }),
            escalation,
            fallbacks,
        })
    }

    /// Feed an outcome back into every learning component.
    pub async fn apply_feedback(
        &self,
        feedback: FeedbackRecord,
    ) -> Result<LearningReport, EngineError> {
        feedback.validate().map_err(EngineError::Validation)?;

        let decision = {
            let decisions = self.decisions.read().await;
            let found = decisions
                .iter()
                .rev()
                .find(|d| d.decision_id == feedback.decision_id)
                .cloned();
            found
        }
        .ok_or(EngineError::UnknownDecision(feedback.decision_id))?;

        Ok(self.learning.apply_feedback(&decision, &feedback).await?)
    }

    pub async fn agent_performance(&self, agent: AgentType) -> AgentPerformanceRecord {
        self.swarm.performance().get(agent).await
    }

    pub async fn model(&self) -> PredictionModel {
        self.scorer.model().await
    }

    pub async fn insights(&self) -> EngineInsights {
        let model = self.scorer.model().await;
        EngineInsights {
            swarm: self.swarm.insights().await,
            model_accuracy: model.accuracy(),
            model,
            cached_decisions: self.decisions.read().await.len(),
        }
    }
}
