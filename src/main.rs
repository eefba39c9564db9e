// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use esm_translate_engine::{
    cfg::{config::EngineConfig, logger::init_logger},
    http,
    orchestrator::Orchestrator,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = EngineConfig::load().context("failed to load engine configuration")?;
    init_logger(&config.log_level).context("failed to initialize logger")?;

    let orchestrator = Arc::new(Orchestrator::new(
        config.api_base_url.clone(),
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
    ));

    let app = http::router(orchestrator);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.engine_port))
        .await
        .with_context(|| format!("failed to bind engine port {}", config.engine_port))?;

    info!(port = config.engine_port, "engine listening");
    axum::serve(listener, app).await.context("engine server exited")?;

    Ok(())
}
