//! Operator CLI for the gatekeeper engine: HTTP model client, knowledge
//! loading, snapshot persistence and the decision log.

pub mod cli;
pub mod config;
pub mod knowledge;
pub mod openai;
pub mod snapshot;
pub mod telemetry;
