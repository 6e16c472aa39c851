use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_therapist;
use shared_utils::AppState;

use crate::models::{AvailabilityError, SetSlotRequest, SlotView};
use crate::services::slots::AvailabilityService;

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidDate(_) | AvailabilityError::InvalidTime(_) => {
                AppError::BadRequest(err.to_string())
            }
            AvailabilityError::TherapistNotFound(_) => AppError::NotFound(err.to_string()),
            AvailabilityError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            AvailabilityError::Serialization(msg) => AppError::Internal(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn get_therapist_slots(
    State(state): State<AppState>,
    Path((therapist_id, date)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let date = AvailabilityService::parse_date(&date)?;

    let service = AvailabilityService::new(&state);
    let slots: Vec<SlotView> = service
        .get_slots(&therapist_id, date)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(json!({
        "therapistId": therapist_id,
        "date": date,
        "slots": slots,
    })))
}

/// A therapist opens or closes one of their own times.
#[axum::debug_handler]
pub async fn set_own_slot(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<SetSlotRequest>,
) -> Result<Json<Value>, AppError> {
    require_therapist(&user)?;
    let date = AvailabilityService::parse_date(&request.date)?;
    let time = AvailabilityService::parse_time(&request.time)?;

    let service = AvailabilityService::new(&state);
    let slot = service.set_slot(&user.id, date, time, request.available).await?;

    Ok(Json(json!(SlotView::from(slot))))
}

pub async fn availability_health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "availability" }))
}
