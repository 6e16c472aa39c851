// libs/appointment-cell/src/handlers.rs
use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use profile_cell::ProfileService;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    AppointmentError, AppointmentView, BookAppointmentRequest, CancelAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::InvalidTransition { .. }
            | AppointmentError::ConcurrentModification
            | AppointmentError::DeletePending => AppError::Conflict(err.to_string()),
            AppointmentError::NotFound
            | AppointmentError::PatientNotFound
            | AppointmentError::TherapistNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidDate(_)
            | AppointmentError::InvalidTime(_)
            | AppointmentError::NotYetDue => AppError::BadRequest(err.to_string()),
            AppointmentError::Unauthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            AppointmentError::Serialization(msg) => AppError::Internal(msg),
        }
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ProfileService::new(&state).ensure_profile(&user).await?;

    let service = AppointmentBookingService::new(&state);
    let appointment = service.create_appointment(&user.id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": AppointmentView::from(appointment),
            "message": "Appointment request sent"
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let buckets = service.partition_for(&user.id, user.is_therapist()).await?;

    Ok(Json(buckets.into_views()))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.get_for_participant(&appointment_id, &user.id).await?;

    Ok(Json(json!(AppointmentView::from(appointment))))
}

// ==============================================================================
// STATUS CHANGES
// ==============================================================================

#[axum::debug_handler]
pub async fn accept_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.accept(&appointment_id, &user.id).await?;

    Ok(Json(json!(AppointmentView::from(appointment))))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.reject(&appointment_id, &user.id).await?;

    Ok(Json(json!(AppointmentView::from(appointment))))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    // The reason is optional, and so is the body carrying it.
    let reason = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<CancelAppointmentRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid cancel request: {}", e)))?
            .reason
    };

    let service = AppointmentBookingService::new(&state);
    let appointment = service.cancel(&appointment_id, &user.id, reason).await?;

    Ok(Json(json!(AppointmentView::from(appointment))))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.complete(&appointment_id, &user.id).await?;

    Ok(Json(json!(AppointmentView::from(appointment))))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let service = AppointmentBookingService::new(&state);
    service.delete(&appointment_id, &user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn appointment_health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "appointments" }))
}
