// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod beta;
pub mod cache;
pub mod chat;
pub mod classify;
pub mod config;
pub mod context;
pub mod corpus;
pub mod generator;
pub mod glossary;
pub mod history;
pub mod metrics;
pub mod prompts;
pub mod relevance;
pub mod resources;
pub mod session;

pub use crate::api::router;

use std::sync::Arc;

use chrono::Local;
use shuttle_axum::axum::Router;
use tracing::info;

use crate::api::AppState;
use crate::chat::ChatService;
use crate::config::ai::{AiConfig, DEFAULT_AI_CONFIG_PATH};
use crate::config::AppConfig;
use crate::generator::build_generator;

/// Build the full application router (chat API, pages, static assets, `/metrics`)
/// from `config/app.toml` and `config/ai.json`.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::load()?;
    let ai_path = std::env::var("AI_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_AI_CONFIG_PATH.to_string());
    let ai = AiConfig::load_or_default(ai_path);
    app_with(cfg, &ai)
}

/// Same as [`app`] with explicit configuration.
pub fn app_with(cfg: AppConfig, ai: &AiConfig) -> anyhow::Result<Router> {
    let generator = build_generator(ai)?;
    info!(provider = generator.provider_name(), model = %ai.model, "answer generator ready");

    let chat = ChatService::from_config(&cfg, ai, generator, Local::now())?;
    let metrics = crate::metrics::Metrics::init()?;

    let state = AppState {
        chat: Arc::new(chat),
        service_name: cfg.service_name.clone(),
        static_dir: cfg.static_dir.clone(),
    };
    Ok(router(state).merge(metrics.router()))
}
