mod common;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::*;
use gatekeeper_core::confidence::Factor;
use gatekeeper_core::feedback::{DecisionRecord, FeedbackRecord};
use gatekeeper_core::persistence::{HistoryEntry, StoreResult};
use gatekeeper_core::{
    AgentPerformanceRecord, Category, EngineError, EscalationReason, FallbackKind, MemoryStore,
    PersistenceStore, PredictionModel, Priority, Recommendation, RequestContext, ResolutionPath,
    StoreError,
};

/// Accepts reads, refuses to write decisions.
struct ReadOnlyStore;

#[async_trait]
impl PersistenceStore for ReadOnlyStore {
    async fn save_decision(&self, _record: &DecisionRecord) -> StoreResult<()> {
        Err(StoreError::Io("disk full".into()))
    }

    async fn load_recent_history(&self, _limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        Ok(Vec::new())
    }

    async fn save_feedback(&self, _feedback: &FeedbackRecord) -> StoreResult<()> {
        Err(StoreError::Io("disk full".into()))
    }

    async fn load_agent_performance(&self) -> StoreResult<Vec<AgentPerformanceRecord>> {
        Ok(Vec::new())
    }

    async fn save_agent_performance(&self, _records: &[AgentPerformanceRecord]) -> StoreResult<()> {
        Err(StoreError::Io("disk full".into()))
    }

    async fn load_prediction_model(&self) -> StoreResult<Option<PredictionModel>> {
        Ok(None)
    }

    async fn save_prediction_model(&self, _model: &PredictionModel) -> StoreResult<()> {
        Err(StoreError::Io("disk full".into()))
    }
}

#[tokio::test]
async fn test_empty_request_is_rejected() {
    let (engine, store) = healthy_engine();

    let err = engine
        .evaluate("   \n", &RequestContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(store.snapshot().await.decisions.is_empty());
}

#[tokio::test]
async fn test_password_request_scores_and_automates() {
    let (engine, store) = healthy_engine();
    let engine = with_unanimous_agents(engine, Some((0.95, Recommendation::Automate)));

    let evaluation = engine
        .evaluate(PASSWORD_QUERY, &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(evaluation.decision.path, ResolutionPath::AutomatedResolution);
    assert!(evaluation.decision.reason.is_none());
    assert!(evaluation.escalation.is_none());
    assert!(!evaluation.used_fallback());
    assert!((evaluation.decision.confidence - 0.95).abs() < 1e-9);
    assert!(evaluation.decision.risk <= 0.3, "risk was {}", evaluation.decision.risk);

    let audit = evaluation.audit.as_ref().unwrap();
    assert!(audit.assessment.factors.get(Factor::Similarity).unwrap() > 0.6);
    assert!(audit.assessment.score > 0.5, "score was {}", audit.assessment.score);
    assert_eq!(audit.assessment.top_matches[0].item_id(), "kb-password");
    assert_eq!(audit.triage.category, Category::PasswordReset);
    assert_eq!(audit.triage.complexity, 2);
    assert_eq!(audit.consensus.consensus_strength, 1.0);

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.decisions.len(), 1);
    assert_eq!(snapshot.decisions[0].decision_id, evaluation.decision_id);
    assert_eq!(
        snapshot.decisions[0].triage_category,
        Some(Category::PasswordReset)
    );
}

#[tokio::test]
async fn test_evaluate_is_idempotent_without_feedback() {
    let (engine, _store) = healthy_engine();
    let context = RequestContext::new();

    let first = engine.evaluate(PASSWORD_QUERY, &context).await.unwrap();
    let second = engine.evaluate(PASSWORD_QUERY, &context).await.unwrap();

    assert_ne!(first.decision_id, second.decision_id);
    assert_eq!(first.decision, second.decision);
    assert_eq!(
        first.audit.as_ref().unwrap().assessment.factors,
        second.audit.as_ref().unwrap().assessment.factors
    );
    assert_eq!(
        first.audit.as_ref().unwrap().consensus.recommendation,
        second.audit.as_ref().unwrap().consensus.recommendation
    );
}

#[tokio::test]
async fn test_critical_priority_escalates_despite_high_confidence() {
    let (engine, _store) = healthy_engine();
    let engine = with_unanimous_agents(engine, Some((0.99, Recommendation::Automate)));

    let explicit = engine
        .evaluate(
            PASSWORD_QUERY,
            &RequestContext::new().with_priority(Priority::Critical),
        )
        .await
        .unwrap();
    assert_eq!(explicit.decision.path, ResolutionPath::Escalation);
    assert_eq!(
        explicit.decision.reason,
        Some(EscalationReason::CriticalPriority)
    );
    assert_eq!(
        explicit.escalation.as_ref().map(|e| e.reason.as_str()),
        Some("Critical priority issue — requires immediate human attention")
    );

    // No priority given: the wording decides.
    let inferred = engine
        .evaluate("The login server is down for everyone", &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(inferred.decision.priority, Priority::Critical);
    assert_eq!(
        inferred.decision.reason,
        Some(EscalationReason::CriticalPriority)
    );
}

#[tokio::test]
async fn test_degraded_services_fall_back_and_escalate() {
    let engine = engine_with(
        Arc::new(FailingEmbedder),
        Arc::new(FailingCompleter),
        Arc::new(MemoryStore::new()),
    );

    let evaluation = engine
        .evaluate(PASSWORD_QUERY, &RequestContext::new())
        .await
        .unwrap();

    let sources: Vec<&str> = evaluation
        .fallbacks
        .iter()
        .map(|n| n.source.as_str())
        .collect();
    assert_eq!(sources, vec!["embed", "triage.fast_pass", "triage.deep_pass"]);
    assert!(evaluation
        .fallbacks
        .iter()
        .all(|n| n.kind == FallbackKind::Transient));

    assert_eq!(evaluation.decision.path, ResolutionPath::Escalation);
    let audit = evaluation.audit.as_ref().unwrap();
    assert_eq!(audit.triage.category, Category::GeneralInquiry);
    assert!(audit.triage.fast_pass_fallback);
    assert!(audit.triage.deep_pass_fallback);
    // The zero-vector embedding contributes nothing through cosine.
    assert!(audit
        .assessment
        .top_matches
        .iter()
        .all(|m| m.breakdown.cosine == 0.0));
}

#[tokio::test]
async fn test_all_agents_failing_escalates_with_insufficient_data() {
    let (engine, _store) = healthy_engine();
    let engine = with_unanimous_agents(engine, None);

    let evaluation = engine
        .evaluate(PASSWORD_QUERY, &RequestContext::new())
        .await
        .unwrap();

    let audit = evaluation.audit.as_ref().unwrap();
    assert_eq!(audit.consensus.recommendation, Recommendation::InsufficientData);
    assert_eq!(audit.consensus.confidence, 0.0);
    assert_eq!(audit.consensus.successful_agents().count(), 0);
    assert_eq!(
        evaluation.decision.reason,
        Some(EscalationReason::LowConfidence { confidence: 0.0 })
    );
}

#[tokio::test]
async fn test_store_failure_becomes_processing_error() {
    let engine = engine_with(
        Arc::new(FixedEmbedder),
        Arc::new(ScriptedCompleter::password()),
        Arc::new(ReadOnlyStore),
    );

    let evaluation = engine
        .evaluate(PASSWORD_QUERY, &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(evaluation.decision.path, ResolutionPath::Escalation);
    assert!(evaluation.audit.is_none());
    assert_eq!(evaluation.decision.confidence, 0.0);
    assert_eq!(evaluation.decision.risk, 1.0);
    let reason = evaluation.decision.reason_text().unwrap();
    assert!(reason.starts_with("Processing error: "), "{reason}");
    assert!(reason.contains("disk full"));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_discards_the_whole_evaluation() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(
        Arc::new(FixedEmbedder),
        Arc::new(StalledCompleter),
        store.clone(),
    );
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let result = engine
        .evaluate_with_cancel(PASSWORD_QUERY, &RequestContext::new(), &token)
        .await;

    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert_eq!(engine.insights().await.cached_decisions, 0);
    assert!(store.snapshot().await.decisions.is_empty());
}

#[tokio::test]
async fn test_uncancelled_token_lets_evaluation_finish() {
    let (engine, _store) = healthy_engine();
    let token = CancellationToken::new();

    let evaluation = engine
        .evaluate_with_cancel(PASSWORD_QUERY, &RequestContext::new(), &token)
        .await
        .unwrap();
    assert!(evaluation.audit.is_some());
}

#[tokio::test]
async fn test_insights_track_swarm_memory() {
    let (engine, _store) = healthy_engine();
    engine
        .evaluate(PASSWORD_QUERY, &RequestContext::new())
        .await
        .unwrap();

    let insights = engine.insights().await;
    assert_eq!(insights.swarm.collective_memory_size, 1);
    assert_eq!(insights.swarm.registered_agents.len(), 3);
    assert_eq!(insights.cached_decisions, 1);
    assert!(insights.model_accuracy.is_none());
}
