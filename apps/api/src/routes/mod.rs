pub mod health;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::chat::handlers as chat_handlers;
use crate::contact::handlers as contact_handlers;
use crate::knowledge::handlers as knowledge_handlers;
use crate::ratelimit;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let chat = Router::new()
        .route("/chat", post(chat_handlers::handle_ask))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::chat_quota,
        ));

    let contact = Router::new()
        .route("/contact", post(contact_handlers::handle_create))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::contact_quota,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(chat)
        .merge(contact)
        .route("/knowledge/upload", post(knowledge_handlers::handle_upload))
        .route("/knowledge", delete(knowledge_handlers::handle_clear))
        .with_state(state)
}
