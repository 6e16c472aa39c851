use tracing::{debug, info};
use uuid::Uuid;

use notification_cell::NotificationService;
use shared_models::auth::User;
use shared_utils::AppState;

use crate::models::{VideoCallError, VideoCallInvite};

/// Page the callee opens to join.
pub fn join_path(call_id: &str) -> String {
    format!("/video-call/{}", call_id)
}

pub struct VideoCallService {
    notifications: NotificationService,
}

impl VideoCallService {
    pub fn new(state: &AppState) -> Self {
        Self {
            notifications: NotificationService::new(state),
        }
    }

    /// Mint a call and notify the callee. Unlike other notifications this one
    /// is the whole point of the request, so delivery failures are returned.
    pub async fn invite(&self, caller: &User, callee_id: &str) -> Result<VideoCallInvite, VideoCallError> {
        if caller.id == callee_id {
            return Err(VideoCallError::SelfCall);
        }

        let call_id = Uuid::new_v4().to_string();
        debug!("User {} inviting {} to call {}", caller.id, callee_id, call_id);

        self.notifications
            .notify_video_call(callee_id, &call_id, &caller.label())
            .await?;

        info!("Video call {} started by {}", call_id, caller.id);

        Ok(VideoCallInvite {
            join_path: join_path(&call_id),
            callee_id: callee_id.to_string(),
            call_id,
        })
    }
}
