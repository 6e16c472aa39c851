use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn therapist_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::therapist_health_check));

    let protected_routes = Router::new()
        .route("/", get(handlers::list_therapists))
        .route("/me/patients", get(handlers::list_my_patients))
        .route(
            "/me/notes/{patient_id}",
            get(handlers::get_patient_note).put(handlers::save_patient_note),
        )
        .route("/{therapist_id}", get(handlers::get_therapist))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
