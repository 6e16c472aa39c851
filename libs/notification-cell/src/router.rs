use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers::*;

pub fn notification_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(notification_health_check));

    let protected_routes = Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_notifications_read))
        .route("/{notification_id}/read", post(mark_notification_read))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
