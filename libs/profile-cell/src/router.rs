use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn profile_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::profile_health_check));

    let protected_routes = Router::new()
        .route(
            "/me",
            get(handlers::get_my_profile).put(handlers::update_my_profile),
        )
        .route("/me/therapist", put(handlers::update_my_therapist_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
