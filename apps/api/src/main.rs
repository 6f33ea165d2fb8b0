mod chat;
mod config;
mod contact;
mod db;
mod errors;
mod knowledge;
mod llm_client;
mod models;
mod notification;
mod ratelimit;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::knowledge::store::VectorStore;
use crate::llm_client::{CompletionProvider, LlmClient};
use crate::notification::{HttpEmailSender, NotificationSender};
use crate::ratelimit::DailyQuotas;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{}={}", crate_target, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV Assistant API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and apply migrations
    let db = create_pool(&config.database_url).await?;

    // Warm the knowledge base from its disk mirror (missing/corrupt is non-fatal)
    let knowledge = Arc::new(VectorStore::new(config.embeddings_file_path.clone()));
    knowledge.load_from_disk().await;

    // Initialize LLM client
    let llm: Arc<dyn CompletionProvider> = Arc::new(LlmClient::new(config.openai_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::CHAT_MODEL);

    // Initialize email sender
    let notifier: Arc<dyn NotificationSender> = Arc::new(HttpEmailSender::new(
        config.email_api_url.clone(),
        config.email_api_key.clone(),
        config.email_from.clone(),
    ));
    info!("Email sender initialized");

    // Build app state
    let state = AppState {
        db,
        llm,
        knowledge,
        notifier,
        quotas: Arc::new(DailyQuotas::new()),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
