use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::knowledge::store::VectorStore;
use crate::llm_client::CompletionProvider;
use crate::notification::NotificationSender;
use crate::ratelimit::DailyQuotas;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Completion provider behind a trait object so tests can stub it.
    pub llm: Arc<dyn CompletionProvider>,
    pub knowledge: Arc<VectorStore>,
    pub notifier: Arc<dyn NotificationSender>,
    pub quotas: Arc<DailyQuotas>,
    pub config: Config,
}
