use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn video_call_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::video_call_health_check));

    let protected_routes = Router::new()
        .route("/", post(handlers::start_video_call))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
