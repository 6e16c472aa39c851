use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn chat_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::chat_health_check));

    let protected_routes = Router::new()
        .route("/conversations", get(handlers::list_conversations))
        .route("/conversations/{partner_id}", post(handlers::open_conversation))
        .route(
            "/{conversation_id}/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route("/{conversation_id}/stream", get(handlers::stream_messages))
        .route("/{conversation_id}/read", post(handlers::mark_conversation_read))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
