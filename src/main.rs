mod config;
mod db;
mod error;
mod llm;
mod model;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::llm::types::LlmChat;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "dispatcher failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::AppConfig::from_env()?;
    let store = db::open(&config).await?;

    // LLM is optional: without it, routing answers 503 and everything else works.
    let (llm, max_tokens) = match llm::config::LlmConfig::from_env() {
        Ok(llm_config) => {
            let max_tokens = llm_config.max_tokens;
            let client = llm::LlmClient::from_config(llm_config)?;
            tracing::info!(model = client.model(), "LLM client initialized");
            (Some(Arc::new(client) as Arc<dyn LlmChat>), max_tokens)
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; routing disabled");
            (None, llm::config::DEFAULT_LLM_MAX_TOKENS)
        }
    };

    let port = config.port;
    let state = state::AppState::new(config, store, llm, max_tokens);

    let cancel = CancellationToken::new();
    let monitor = services::health::spawn_health_monitor(state.clone(), cancel.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(%port, "dispatcher listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    monitor.await?;
    tracing::info!("dispatcher stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
