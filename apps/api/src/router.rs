use axum::{
    Router,
    routing::get,
};

use appointment_cell::appointment_routes;
use availability_cell::availability_routes;
use chat_cell::chat_routes;
use notification_cell::notification_routes;
use profile_cell::profile_routes;
use shared_utils::AppState;
use therapist_cell::therapist_routes;
use video_call_cell::video_call_routes;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Wellness API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/chat", chat_routes(state.clone()))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/users", profile_routes(state.clone()))
        .nest("/therapists", therapist_routes(state.clone()))
        .nest("/video-calls", video_call_routes(state))
}
