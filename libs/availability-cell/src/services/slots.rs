use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};

use shared_database::{collections, to_fields, DocumentStore, Query};
use shared_models::clock;
use shared_models::user::UserProfile;
use shared_utils::AppState;

use crate::models::{AvailabilityError, AvailabilitySlot};

const FIRST_SLOT_HOUR: u32 = 9;
const GENERATED_SLOTS: i64 = 16;
const SLOT_MINUTES: i64 = 30;
/// A generated slot is open when the draw lands above this.
const BUSY_THRESHOLD: f64 = 0.3;

/// Source of uniform draws in `[0, 1)` for generated availability.
pub trait SlotRng: Send {
    fn next_unit(&mut self) -> f64;
}

impl SlotRng for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Stable document id for a therapist's slot.
pub fn slot_key(therapist_id: &str, date: NaiveDate, time: NaiveTime) -> String {
    format!("{}_{}_{}", therapist_id, date, time.format("%H%M"))
}

// FNV-1a, so a configured seed gives each therapist and day its own sequence.
fn mix_seed(seed: u64, therapist_id: &str, date: NaiveDate) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in therapist_id.bytes().chain(date.to_string().into_bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    seed ^ hash
}

pub struct AvailabilityService {
    store: Arc<dyn DocumentStore>,
    seed: Option<u64>,
    persist_generated: bool,
    rng: Option<Mutex<Box<dyn SlotRng>>>,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            seed: state.config.availability_seed,
            persist_generated: state.config.persist_generated_slots,
            rng: None,
        }
    }

    /// Draw generated availability from `rng` instead of the configured seed.
    pub fn with_rng(state: &AppState, rng: Box<dyn SlotRng>) -> Self {
        Self {
            rng: Some(Mutex::new(rng)),
            ..Self::new(state)
        }
    }

    pub fn parse_date(raw: &str) -> Result<NaiveDate, AvailabilityError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| AvailabilityError::InvalidDate(raw.to_string()))
    }

    pub fn parse_time(raw: &str) -> Result<NaiveTime, AvailabilityError> {
        clock::parse(raw).ok_or_else(|| AvailabilityError::InvalidTime(raw.to_string()))
    }

    /// Slots for one therapist and day, earliest first, one per time.
    pub async fn get_slots(
        &self,
        therapist_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, AvailabilityError> {
        debug!("Loading availability for {} on {}", therapist_id, date);

        let stored = self.stored_slots(therapist_id, date).await?;
        if !stored.is_empty() {
            return Ok(normalize(stored));
        }

        self.require_listed_therapist(therapist_id).await?;

        let generated = self.generate(therapist_id, date);
        if !self.persist_generated {
            return Ok(generated);
        }

        for slot in &generated {
            self.store
                .upsert(collections::AVAILABILITY, &slot.id, to_fields(slot)?)
                .await?;
        }
        info!("Saved {} generated slots for {} on {}", generated.len(), therapist_id, date);

        Ok(generated)
    }

    // Generation only runs for ids that resolve to a therapist profile.
    async fn require_listed_therapist(&self, therapist_id: &str) -> Result<(), AvailabilityError> {
        let profile: Option<UserProfile> = match self.store.get(collections::USERS, therapist_id).await? {
            Some(doc) => Some(doc.parse()?),
            None => None,
        };

        match profile {
            Some(profile) if profile.is_therapist() => Ok(()),
            _ => Err(AvailabilityError::TherapistNotFound(therapist_id.to_string())),
        }
    }

    /// Open or close one time. An existing slot at that time is updated in place.
    pub async fn set_slot(
        &self,
        therapist_id: &str,
        date: NaiveDate,
        time: NaiveTime,
        available: bool,
    ) -> Result<AvailabilitySlot, AvailabilityError> {
        let existing = self
            .stored_slots(therapist_id, date)
            .await?
            .into_iter()
            .find(|slot| slot.time == time);

        let mut slot = AvailabilitySlot {
            id: existing
                .map(|s| s.id)
                .unwrap_or_else(|| slot_key(therapist_id, date, time)),
            therapist_id: therapist_id.to_string(),
            date,
            time,
            available,
        };

        let doc = self
            .store
            .upsert(collections::AVAILABILITY, &slot.id, to_fields(&slot)?)
            .await?;
        slot.id = doc.id;

        info!(
            "Therapist {} marked {} {} as {}",
            therapist_id,
            date,
            clock::format(&time),
            if available { "open" } else { "busy" }
        );
        Ok(slot)
    }

    async fn stored_slots(
        &self,
        therapist_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, AvailabilityError> {
        let docs = self
            .store
            .query(
                collections::AVAILABILITY,
                &Query::new()
                    .eq("therapistId", therapist_id)
                    .eq("date", date.to_string()),
            )
            .await?;

        Ok(docs
            .iter()
            .map(|doc| doc.parse::<AvailabilitySlot>())
            .collect::<Result<Vec<_>, _>>()?)
    }

    fn generate(&self, therapist_id: &str, date: NaiveDate) -> Vec<AvailabilitySlot> {
        match &self.rng {
            Some(shared) => {
                let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                generate_slots(guard.as_mut(), therapist_id, date)
            }
            None => {
                let mut rng = match self.seed {
                    Some(seed) => StdRng::seed_from_u64(mix_seed(seed, therapist_id, date)),
                    None => StdRng::from_entropy(),
                };
                generate_slots(&mut rng, therapist_id, date)
            }
        }
    }
}

/// The half-hour grid from 9:00, each time open with probability 0.7.
fn generate_slots<R: SlotRng + ?Sized>(
    rng: &mut R,
    therapist_id: &str,
    date: NaiveDate,
) -> Vec<AvailabilitySlot> {
    let start = NaiveTime::from_hms_opt(FIRST_SLOT_HOUR, 0, 0).unwrap_or_default();
    (0..GENERATED_SLOTS)
        .map(|i| {
            let time = start + Duration::minutes(i * SLOT_MINUTES);
            AvailabilitySlot {
                id: slot_key(therapist_id, date, time),
                therapist_id: therapist_id.to_string(),
                date,
                time,
                available: rng.next_unit() > BUSY_THRESHOLD,
            }
        })
        .collect()
}

/// Sort by clock time and keep the first slot stored for each time.
fn normalize(mut slots: Vec<AvailabilitySlot>) -> Vec<AvailabilitySlot> {
    slots.sort_by_key(|slot| slot.time);
    let mut seen = HashSet::new();
    slots.retain(|slot| seen.insert(slot.time));
    slots
}
