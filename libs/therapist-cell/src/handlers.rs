use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_therapist;
use shared_utils::AppState;

use crate::models::{DirectoryQuery, SaveNoteRequest, TherapistError};
use crate::services::directory::TherapistDirectoryService;
use crate::services::roster::PatientRosterService;

impl From<TherapistError> for AppError {
    fn from(err: TherapistError) -> Self {
        match err {
            TherapistError::TherapistNotFound(_) => AppError::NotFound(err.to_string()),
            TherapistError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            TherapistError::Serialization(msg) => AppError::Internal(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn list_therapists(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Value>, AppError> {
    let service = TherapistDirectoryService::new(&state);
    let therapists = service
        .list_therapists(query.specialty.as_deref(), query.search.as_deref())
        .await?;

    Ok(Json(json!({
        "therapists": therapists,
        "total": therapists.len(),
    })))
}

#[axum::debug_handler]
pub async fn get_therapist(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(therapist_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = TherapistDirectoryService::new(&state);
    let therapist = service.get_therapist(&therapist_id).await?;
    Ok(Json(json!(therapist)))
}

#[axum::debug_handler]
pub async fn list_my_patients(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_therapist(&user)?;

    let service = PatientRosterService::new(&state);
    let patients = service.list_patients(&user.id).await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len(),
    })))
}

#[axum::debug_handler]
pub async fn get_patient_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_therapist(&user)?;

    let service = PatientRosterService::new(&state);
    let notes = service
        .get_note(&user.id, &patient_id)
        .await?
        .map(|note| note.notes)
        .unwrap_or_default();

    Ok(Json(json!({
        "patientId": patient_id,
        "notes": notes,
    })))
}

#[axum::debug_handler]
pub async fn save_patient_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
    Json(request): Json<SaveNoteRequest>,
) -> Result<Json<Value>, AppError> {
    require_therapist(&user)?;

    let service = PatientRosterService::new(&state);
    let note = service.save_note(&user.id, &patient_id, &request.notes).await?;

    Ok(Json(json!({
        "id": note.id,
        "patientId": note.patient_id,
        "notes": note.notes,
        "updatedAt": note.updated_at,
    })))
}

pub async fn therapist_health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "therapists" }))
}
