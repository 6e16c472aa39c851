use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use shared_database::{collections, to_fields, DocumentStore};
use shared_models::auth::User;
use shared_models::user::{UserProfile, UserRole};
use shared_utils::AppState;

use crate::models::{ProfileError, TherapistProfileUpdate, UpdateProfileRequest};

pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
        }
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, ProfileError> {
        let doc = self
            .store
            .get(collections::USERS, user_id)
            .await?
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;
        Ok(doc.parse()?)
    }

    /// The caller's record, written from their token claims if it does not exist yet.
    pub async fn ensure_profile(&self, user: &User) -> Result<UserProfile, ProfileError> {
        if let Some(doc) = self.store.get(collections::USERS, &user.id).await? {
            return Ok(doc.parse()?);
        }

        let profile = profile_from_claims(user);
        let mut fields = to_fields(&profile)?;
        if let Some(obj) = fields.as_object_mut() {
            obj.insert("createdAt".to_string(), json!(Utc::now()));
        }

        let doc = self.store.upsert(collections::USERS, &user.id, fields).await?;
        info!("Created profile for {} as {:?}", user.id, profile.role);
        Ok(doc.parse()?)
    }

    pub async fn update_profile(
        &self,
        user: &User,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ProfileError> {
        let mut patch = Map::new();
        if let Some(name) = request.display_name {
            patch.insert("displayName".to_string(), json!(clean_name(&name)?));
        }

        self.apply(user, patch).await
    }

    /// Directory details. The token must carry the therapist role.
    pub async fn update_therapist_profile(
        &self,
        user: &User,
        update: TherapistProfileUpdate,
    ) -> Result<UserProfile, ProfileError> {
        if !user.is_therapist() {
            return Err(ProfileError::NotTherapist);
        }

        let mut patch = Map::new();
        patch.insert("role".to_string(), json!(UserRole::Therapist));
        if let Some(name) = update.display_name {
            patch.insert("displayName".to_string(), json!(clean_name(&name)?));
        }
        if let Some(bio) = update.bio {
            patch.insert("bio".to_string(), json!(bio.trim()));
        }
        if let Some(specialties) = update.specialties {
            patch.insert("specialties".to_string(), json!(clean_list(specialties)));
        }
        if let Some(session_types) = update.session_types {
            patch.insert("sessionTypes".to_string(), json!(clean_list(session_types)));
        }
        if let Some(fee) = update.session_fee {
            patch.insert("sessionFee".to_string(), json!(fee.trim()));
        }
        if let Some(url) = update.photo_url {
            patch.insert("photoURL".to_string(), json!(url));
        }

        self.apply(user, patch).await
    }

    async fn apply(&self, user: &User, mut patch: Map<String, Value>) -> Result<UserProfile, ProfileError> {
        self.ensure_profile(user).await?;
        if patch.is_empty() {
            return self.get_profile(&user.id).await;
        }

        debug!("Updating profile {} ({} fields)", user.id, patch.len());
        patch.insert("updatedAt".to_string(), json!(Utc::now()));
        let doc = self
            .store
            .update(collections::USERS, &user.id, Value::Object(patch))
            .await?;
        Ok(doc.parse()?)
    }
}

fn profile_from_claims(user: &User) -> UserProfile {
    let role = user.user_role().unwrap_or(UserRole::Guest);
    let flagged = user
        .metadata
        .as_ref()
        .and_then(|m| m.get("is_anonymous"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    UserProfile {
        id: user.id.clone(),
        display_name: user.display_name.clone().unwrap_or_default(),
        email: user.email.clone(),
        role: Some(role),
        is_anonymous: flagged || role == UserRole::Anonymous,
        ..UserProfile::default()
    }
}

fn clean_name(raw: &str) -> Result<String, ProfileError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ProfileError::InvalidField("displayName"));
    }
    Ok(name.to_string())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !cleaned.iter().any(|c| c == item) {
            cleaned.push(item.to_string());
        }
    }
    cleaned
}
