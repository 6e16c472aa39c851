use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{InviteRequest, VideoCallError};
use crate::services::invite::VideoCallService;

impl From<VideoCallError> for AppError {
    fn from(err: VideoCallError) -> Self {
        match err {
            VideoCallError::RecipientNotFound(_) => AppError::NotFound(err.to_string()),
            VideoCallError::SelfCall => AppError::BadRequest(err.to_string()),
            VideoCallError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            VideoCallError::Serialization(msg) => AppError::Internal(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn start_video_call(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<InviteRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = VideoCallService::new(&state);
    let invite = service.invite(&user, &request.callee_id).await?;

    Ok((StatusCode::CREATED, Json(json!(invite))))
}

pub async fn video_call_health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "video-calls" }))
}
