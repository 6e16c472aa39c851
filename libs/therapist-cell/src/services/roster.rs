use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use appointment_cell::{
    Appointment, AppointmentBookingService, AppointmentLifecycleService, AppointmentStatus,
};
use shared_database::{collections, to_fields, DocumentStore, Query};
use shared_models::user::UserProfile;
use shared_utils::AppState;

use crate::models::{AppointmentRef, PatientStatus, PatientSummary, TherapistError, TherapistNote};

pub fn note_key(therapist_id: &str, patient_id: &str) -> String {
    format!("{}_{}", therapist_id, patient_id)
}

pub struct PatientRosterService {
    store: Arc<dyn DocumentStore>,
    appointments: AppointmentBookingService,
    lifecycle: AppointmentLifecycleService,
}

impl PatientRosterService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            appointments: AppointmentBookingService::new(state),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub async fn list_patients(&self, therapist_id: &str) -> Result<Vec<PatientSummary>, TherapistError> {
        self.list_patients_at(therapist_id, Local::now().naive_local()).await
    }

    /// Patients with at least one appointment with this therapist. Those with
    /// something coming up are listed first, soonest first; the rest by their
    /// most recent appointment.
    pub async fn list_patients_at(
        &self,
        therapist_id: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<PatientSummary>, TherapistError> {
        let appointments = self.appointments.list_for_therapist(therapist_id).await?;
        debug!("Building roster for {} from {} appointments", therapist_id, appointments.len());

        let mut by_patient: HashMap<String, Vec<Appointment>> = HashMap::new();
        for appointment in appointments {
            by_patient
                .entry(appointment.patient_id.clone())
                .or_default()
                .push(appointment);
        }

        let mut roster = Vec::with_capacity(by_patient.len());
        for (patient_id, history) in by_patient {
            // Patients whose user record is gone are left out.
            let Some(doc) = self.store.get(collections::USERS, &patient_id).await? else {
                continue;
            };
            let profile: UserProfile = doc.parse()?;
            roster.push(self.summarize(profile, &history, now));
        }

        roster.sort_by(|a, b| match (&a.next_appointment, &b.next_appointment) {
            (Some(x), Some(y)) => (x.date, x.time).cmp(&(y.date, y.time)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => {
                let last = |s: &PatientSummary| s.last_appointment.as_ref().map(|r| (r.date, r.time));
                last(b).cmp(&last(a))
            }
        });

        Ok(roster)
    }

    fn summarize(&self, profile: UserProfile, history: &[Appointment], now: NaiveDateTime) -> PatientSummary {
        let to_ref = |a: &Appointment| AppointmentRef {
            id: a.id.clone(),
            date: a.date,
            time: a.time,
            status: a.status,
        };

        // History arrives sorted by (date, time).
        let (past, upcoming): (Vec<&Appointment>, Vec<&Appointment>) = history
            .iter()
            .partition(|a| self.lifecycle.is_past_at(a.date, a.time, now));
        let last_appointment = past.last().map(|a| to_ref(*a));
        let next_appointment = upcoming.first().map(|a| to_ref(*a));

        let status = match &next_appointment {
            Some(next) if next.status == AppointmentStatus::Accepted => PatientStatus::Active,
            _ if history.len() == 1 && last_appointment.is_none() => PatientStatus::New,
            _ => PatientStatus::Inactive,
        };

        // Booked anonymously at least once: keep the name and email hidden.
        let anonymous = history.iter().any(|a| a.patient_is_anonymous);

        PatientSummary {
            name: if anonymous {
                "Anonymous User".to_string()
            } else {
                profile.label()
            },
            email: if anonymous { None } else { profile.email },
            patient_id: profile.id,
            photo_url: profile.photo_url,
            appointment_count: history.len(),
            last_appointment,
            next_appointment,
            status,
        }
    }

    pub async fn get_note(
        &self,
        therapist_id: &str,
        patient_id: &str,
    ) -> Result<Option<TherapistNote>, TherapistError> {
        let docs = self
            .store
            .query(
                collections::THERAPIST_NOTES,
                &Query::new()
                    .eq("therapistId", therapist_id)
                    .eq("patientId", patient_id)
                    .limit(1),
            )
            .await?;

        match docs.first() {
            Some(doc) => Ok(Some(doc.parse()?)),
            None => Ok(None),
        }
    }

    /// Replace the note text, creating the note on first save.
    pub async fn save_note(
        &self,
        therapist_id: &str,
        patient_id: &str,
        notes: &str,
    ) -> Result<TherapistNote, TherapistError> {
        let now = Utc::now();

        let doc = match self.get_note(therapist_id, patient_id).await? {
            Some(existing) => {
                self.store
                    .update(
                        collections::THERAPIST_NOTES,
                        &existing.id,
                        json!({ "notes": notes, "updatedAt": now }),
                    )
                    .await?
            }
            None => {
                let note = TherapistNote {
                    id: String::new(),
                    therapist_id: therapist_id.to_string(),
                    patient_id: patient_id.to_string(),
                    notes: notes.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                self.store
                    .upsert(
                        collections::THERAPIST_NOTES,
                        &note_key(therapist_id, patient_id),
                        to_fields(&note)?,
                    )
                    .await?
            }
        };

        info!("Saved notes of {} on patient {}", therapist_id, patient_id);
        Ok(doc.parse()?)
    }
}
