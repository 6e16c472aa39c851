use std::sync::Arc;

use tracing::debug;

use shared_database::{collections, DocumentStore, Query};
use shared_models::user::UserProfile;
use shared_utils::AppState;

use crate::models::{TherapistError, TherapistListing};

pub struct TherapistDirectoryService {
    store: Arc<dyn DocumentStore>,
}

impl TherapistDirectoryService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
        }
    }

    /// Therapists sorted by name. `specialty` matches one listed specialty
    /// exactly, ignoring case; `search` is a substring of the name.
    pub async fn list_therapists(
        &self,
        specialty: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<TherapistListing>, TherapistError> {
        debug!("Listing therapists (specialty: {:?}, search: {:?})", specialty, search);

        let docs = self
            .store
            .query(collections::USERS, &Query::new().eq("role", "therapist"))
            .await?;

        let specialty = specialty
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
            .map(str::to_lowercase);
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut listings = Vec::new();
        for doc in &docs {
            let profile: UserProfile = doc.parse()?;

            if let Some(wanted) = &specialty {
                if !profile.specialties.iter().any(|s| s.to_lowercase() == *wanted) {
                    continue;
                }
            }
            if let Some(term) = &search {
                if !profile.label().to_lowercase().contains(term.as_str()) {
                    continue;
                }
            }

            listings.push(TherapistListing::from(profile));
        }

        listings.sort_by_key(|t| t.display_name.to_lowercase());
        Ok(listings)
    }

    pub async fn get_therapist(&self, therapist_id: &str) -> Result<TherapistListing, TherapistError> {
        let profile: UserProfile = self
            .store
            .get(collections::USERS, therapist_id)
            .await?
            .ok_or_else(|| TherapistError::TherapistNotFound(therapist_id.to_string()))?
            .parse()?;

        if !profile.is_therapist() {
            return Err(TherapistError::TherapistNotFound(therapist_id.to_string()));
        }

        Ok(profile.into())
    }
}
