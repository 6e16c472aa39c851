use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{NotificationError, NotificationView};
use crate::services::emitter::NotificationService;

/// The bell shows the ten most recent.
const DEFAULT_LIST_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub limit: Option<usize>,
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::RecipientNotFound(id) => {
                AppError::NotFound(format!("User {} does not exist", id))
            }
            NotificationError::NotFound(id) => {
                AppError::NotFound(format!("Notification {} not found", id))
            }
            NotificationError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            NotificationError::Serialization(msg) => AppError::Internal(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let notifications = service
        .list_for_user(&user.id, Some(query.limit.unwrap_or(DEFAULT_LIST_LIMIT)))
        .await?;
    // No profile yet means nothing has been delivered.
    let unread = match service.unread_count(&user.id).await {
        Ok(count) => count,
        Err(NotificationError::RecipientNotFound(_)) => 0,
        Err(e) => return Err(e.into()),
    };

    let views: Vec<NotificationView> = notifications.into_iter().map(Into::into).collect();
    Ok(Json(json!({
        "notifications": views,
        "unreadCount": unread,
    })))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let notification = service.get_notification(&notification_id).await?;
    if notification.user_id != user.id {
        return Err(AppError::Forbidden("Not your notification".to_string()));
    }

    let unread = service.mark_read(&notification_id).await?;
    Ok(Json(json!({
        "success": true,
        "unreadCount": unread,
    })))
}

#[axum::debug_handler]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);
    let (updated, unread) = service.mark_all_read(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "updated": updated,
        "unreadCount": unread,
    })))
}

pub async fn notification_health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "notifications" }))
}
