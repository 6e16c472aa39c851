use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{ProfileError, ProfileView, TherapistProfileUpdate, UpdateProfileRequest};
use crate::services::profiles::ProfileService;

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(_) => AppError::NotFound(err.to_string()),
            ProfileError::NotTherapist => AppError::Forbidden(err.to_string()),
            ProfileError::InvalidField(_) => AppError::ValidationError(err.to_string()),
            ProfileError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            ProfileError::Serialization(msg) => AppError::Internal(msg),
        }
    }
}

/// The caller's profile, created from their token on first call.
#[axum::debug_handler]
pub async fn get_my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let profile = ProfileService::new(&state).ensure_profile(&user).await?;
    Ok(Json(json!(ProfileView::from(profile))))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let profile = ProfileService::new(&state).update_profile(&user, request).await?;
    Ok(Json(json!(ProfileView::from(profile))))
}

#[axum::debug_handler]
pub async fn update_my_therapist_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(update): Json<TherapistProfileUpdate>,
) -> Result<Json<Value>, AppError> {
    let profile = ProfileService::new(&state)
        .update_therapist_profile(&user, update)
        .await?;
    Ok(Json(json!(ProfileView::from(profile))))
}

pub async fn profile_health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "users" }))
}
