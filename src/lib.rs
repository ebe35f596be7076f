//! consilium — multi-specialist diagnostic analysis service.
//!
//! One validated patient record fans out to N independent LLM specialist
//! analyses, joins at an all-settle barrier, and a second-stage synthesis
//! call composes the final diagnosis, which is persisted and served back
//! over a small HTTP API.
//!
//! Module map:
//! - [`specialists`] — the fixed, ordered registry of analysis personas
//! - [`llm`] — provider abstraction over the inference endpoint
//! - [`analysis`] — the fan-out/fan-in orchestrator (the core)
//! - [`patient`] / [`report`] — intake and output payloads
//! - [`store`] — SQLite report persistence
//! - [`http`] — axum intake boundary

pub mod analysis;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod logger;
pub mod patient;
pub mod report;
pub mod specialists;
pub mod store;
