use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn availability_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::availability_health_check));

    let protected_routes = Router::new()
        .route("/slots", put(handlers::set_own_slot))
        .route("/{therapist_id}/{date}", get(handlers::get_therapist_slots))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
