use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use uuid::Uuid;

use gatekeeper_core::{AgentType, Priority, ResolutionOutcome, UserLevel};

#[derive(Debug, thiserror::Error)]
#[error("invalid value '{value}', expected one of: {expected}")]
pub struct ParseValueError {
    value: String,
    expected: &'static str,
}

/// Parse a snake_case enum name through its serde representation.
fn snake_case<T: DeserializeOwned>(
    value: &str,
    expected: &'static str,
) -> Result<T, ParseValueError> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase())).map_err(|_| {
        ParseValueError {
            value: value.to_string(),
            expected,
        }
    })
}

fn parse_user_level(value: &str) -> Result<UserLevel, ParseValueError> {
    snake_case(value, "beginner, intermediate, advanced")
}

fn parse_priority(value: &str) -> Result<Priority, ParseValueError> {
    snake_case(value, "low, medium, high, critical")
}

fn parse_outcome(value: &str) -> Result<ResolutionOutcome, ParseValueError> {
    snake_case(value, "resolved, not_resolved, partially_resolved")
}

fn parse_agent(value: &str) -> Result<AgentType, ParseValueError> {
    snake_case(value, "triage, confidence, research")
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration (TOML)
    #[arg(long, default_value = "config/gatekeeper.toml")]
    pub config: PathBuf,

    /// Knowledge items (JSON array)
    #[arg(long, default_value = "config/knowledge.json")]
    pub knowledge: PathBuf,

    /// Snapshot of decisions and learned state (JSON)
    #[arg(long, default_value = ".gatekeeper-state.json")]
    pub state: PathBuf,

    /// Decision log (JSONL, append-only)
    #[arg(long, default_value = ".gatekeeper-decisions.jsonl")]
    pub telemetry: PathBuf,

    /// OpenAI-compatible base URL (overrides GATEKEEPER_LLM_URL)
    #[arg(long)]
    pub llm_url: Option<String>,

    /// API key for the endpoint (overrides GATEKEEPER_LLM_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Route one support request
    Evaluate {
        /// Request text
        text: String,

        #[arg(long, value_parser = parse_user_level, default_value = "intermediate")]
        user_level: UserLevel,

        /// Explicit priority; inferred from the text when omitted
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,

        /// Operating system or product the user is on
        #[arg(long)]
        system: Option<String>,

        #[arg(long, default_value_t = false)]
        urgent: bool,

        /// Print the full audit trail, not only the decision
        #[arg(long, default_value_t = false)]
        audit: bool,
    },

    /// Report how a past decision turned out
    Feedback {
        decision_id: Uuid,

        #[arg(value_parser = parse_outcome)]
        outcome: ResolutionOutcome,

        /// User satisfaction, 0.0–1.0
        #[arg(long, default_value_t = 0.5)]
        satisfaction: f64,

        /// Explicit accuracy signal, 0.0–1.0
        #[arg(long)]
        accuracy: Option<f64>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Show agent performance records
    Agents {
        /// Single agent; all configured agents when omitted
        #[arg(value_parser = parse_agent)]
        agent: Option<AgentType>,
    },

    /// Show swarm and model insights
    Insights,
}
