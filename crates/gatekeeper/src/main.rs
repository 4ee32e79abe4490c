use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gatekeeper::cli::{Cli, Command};
use gatekeeper::config::ServiceConfig;
use gatekeeper::knowledge::load_index;
use gatekeeper::openai::OpenAiClient;
use gatekeeper::snapshot::JsonFileStore;
use gatekeeper::telemetry::{append_decision, DecisionLogEntry};
use gatekeeper_core::{FeedbackRecord, Gatekeeper, GatekeeperConfig, RequestContext};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = build_engine(&cli).await?;

    match cli.command {
        Command::Evaluate {
            text,
            user_level,
            priority,
            system,
            urgent,
            audit,
        } => {
            let mut context = RequestContext::new()
                .with_user_level(user_level)
                .with_urgent(urgent);
            if let Some(priority) = priority {
                context = context.with_priority(priority);
            }
            if let Some(system) = system {
                context = context.with_system(system);
            }

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling evaluation");
                    on_interrupt.cancel();
                }
            });

            let evaluation = engine
                .evaluate_with_cancel(&text, &context, &cancel)
                .await
                .context("Evaluation failed")?;
            append_decision(
                &DecisionLogEntry::from_evaluation(&evaluation),
                &cli.telemetry,
            );

            if audit {
                print_json(&evaluation)?;
            } else {
                print_json(&serde_json::json!({
                    "decision_id": evaluation.decision_id,
                    "decision": evaluation.decision,
                    "escalation": evaluation.escalation,
                    "fallbacks": evaluation.fallbacks,
                }))?;
            }
        }

        Command::Feedback {
            decision_id,
            outcome,
            satisfaction,
            accuracy,
            comment,
        } => {
            let mut feedback = FeedbackRecord::new(decision_id, outcome, satisfaction);
            if let Some(accuracy) = accuracy {
                feedback = feedback.with_confidence_accuracy(accuracy);
            }
            if let Some(comment) = comment {
                feedback = feedback.with_comments(comment);
            }

            let report = engine
                .apply_feedback(feedback)
                .await
                .context("Failed to apply feedback")?;
            print_json(&report)?;
        }

        Command::Agents { agent } => {
            let agents = match agent {
                Some(agent) => vec![agent],
                None => engine.config().swarm.agents.clone(),
            };
            let mut records = Vec::with_capacity(agents.len());
            for agent in agents {
                records.push(engine.agent_performance(agent).await);
            }
            print_json(&records)?;
        }

        Command::Insights => {
            print_json(&engine.insights().await)?;
        }
    }

    Ok(())
}

async fn build_engine(cli: &Cli) -> Result<Gatekeeper> {
    let config = GatekeeperConfig::load(&cli.config)
        .with_context(|| format!("Failed to load engine config {}", cli.config.display()))?;

    let mut services = ServiceConfig::default();
    if let Some(url) = &cli.llm_url {
        services = services.with_base_url(url.clone());
    }
    if let Some(key) = &cli.api_key {
        services = services.with_api_key(key.clone());
    }
    info!(
        url = %services.base_url,
        fast = %services.fast_model,
        deep = %services.deep_model,
        embed = %services.embed_model,
        "Model endpoint configured"
    );
    let client = Arc::new(OpenAiClient::new(services).context("Failed to build HTTP client")?);

    let index = load_index(&cli.knowledge, client.as_ref()).await?;
    let store = Arc::new(
        JsonFileStore::open(&cli.state)
            .await
            .with_context(|| format!("Failed to open state {}", cli.state.display()))?,
    );

    let engine = Gatekeeper::new(config, client.clone(), client, index, store)
        .context("Failed to initialize engine")?;
    engine.restore().await.context("Failed to restore learned state")?;
    Ok(engine)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
