// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use notification_cell::NotificationService;
use shared_database::{collections, to_fields, DocumentStore, Query};
use shared_models::clock;
use shared_models::user::UserProfile;
use shared_utils::AppState;

use crate::models::{
    Appointment, AppointmentBuckets, AppointmentError, AppointmentStatus,
    BookAppointmentRequest, CancelledBy,
};
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    store: Arc<dyn DocumentStore>,
    notifications: NotificationService,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            notifications: NotificationService::new(state),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Book a pending appointment for `patient_id` and tell the therapist about it.
    pub async fn create_appointment(
        &self,
        patient_id: &str,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking appointment for patient {} with therapist {}", patient_id, request.therapist_id);

        let date = NaiveDate::parse_from_str(request.date.trim(), "%Y-%m-%d")
            .map_err(|_| AppointmentError::InvalidDate(request.date.clone()))?;
        let time = clock::parse(&request.time)
            .ok_or_else(|| AppointmentError::InvalidTime(request.time.clone()))?;

        let patient = self
            .load_profile(patient_id)
            .await?
            .ok_or(AppointmentError::PatientNotFound)?;
        let therapist = self
            .load_profile(&request.therapist_id)
            .await?
            .ok_or(AppointmentError::TherapistNotFound)?;

        let anonymous = request.is_anonymous || patient.is_anonymous;
        let patient_name = if anonymous {
            "Anonymous User".to_string()
        } else {
            patient.label()
        };

        let mut appointment = Appointment {
            id: String::new(),
            therapist_id: request.therapist_id.clone(),
            therapist_name: therapist.label(),
            patient_id: patient_id.to_string(),
            patient_name,
            patient_is_anonymous: anonymous,
            date,
            time,
            session_type: request.session_type,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
            cancel_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            completed_at: None,
        };

        let doc = self
            .store
            .insert(collections::APPOINTMENTS, to_fields(&appointment)?)
            .await
            .map_err(|e| {
                error!("Failed to store appointment: {}", e);
                AppointmentError::from(e)
            })?;
        appointment.id = doc.id;

        info!("Appointment {} requested for {}", appointment.id, appointment.describe_slot());

        let message = format!(
            "New {} appointment request from {} for {}",
            appointment.session_type,
            appointment.patient_name,
            appointment.describe_slot()
        );
        self.notify_quietly(&appointment.therapist_id, &appointment.id, &message).await;

        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        let doc = self
            .store
            .get(collections::APPOINTMENTS, appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;
        Ok(doc.parse()?)
    }

    /// Fetch an appointment the caller takes part in.
    pub async fn get_for_participant(
        &self,
        appointment_id: &str,
        actor_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;
        if !appointment.is_participant(actor_id) {
            return Err(AppointmentError::Unauthorized);
        }
        Ok(appointment)
    }

    pub async fn accept(&self, appointment_id: &str, actor_id: &str) -> Result<Appointment, AppointmentError> {
        let current = self.get_as_therapist(appointment_id, actor_id).await?;
        let accepted = self.transition(&current, AppointmentStatus::Accepted, json!({})).await?;

        let message = format!(
            "{} accepted your appointment on {}",
            accepted.therapist_name,
            accepted.describe_slot()
        );
        self.notify_quietly(&accepted.patient_id, &accepted.id, &message).await;

        Ok(accepted)
    }

    pub async fn reject(&self, appointment_id: &str, actor_id: &str) -> Result<Appointment, AppointmentError> {
        let current = self.get_as_therapist(appointment_id, actor_id).await?;
        let rejected = self.transition(&current, AppointmentStatus::Rejected, json!({})).await?;

        let message = format!(
            "{} declined your appointment request for {}",
            rejected.therapist_name,
            rejected.describe_slot()
        );
        self.notify_quietly(&rejected.patient_id, &rejected.id, &message).await;

        Ok(rejected)
    }

    /// Either party may cancel a pending or accepted appointment.
    pub async fn cancel(
        &self,
        appointment_id: &str,
        actor_id: &str,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_for_participant(appointment_id, actor_id).await?;

        let cancelled_by = if current.patient_id == actor_id {
            CancelledBy::Patient
        } else {
            CancelledBy::Therapist
        };
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let cancelled = self
            .transition(
                &current,
                AppointmentStatus::Cancelled,
                json!({
                    "cancelledBy": cancelled_by,
                    "cancelReason": reason,
                    "cancelledAt": Utc::now(),
                }),
            )
            .await?;

        let (recipient, canceller) = match cancelled_by {
            CancelledBy::Patient => (&cancelled.therapist_id, &cancelled.patient_name),
            CancelledBy::Therapist => (&cancelled.patient_id, &cancelled.therapist_name),
        };
        let mut message = format!("{} cancelled the appointment on {}", canceller, cancelled.describe_slot());
        if let Some(reason) = &cancelled.cancel_reason {
            message.push_str(&format!(": {}", reason));
        }
        self.notify_quietly(recipient, &cancelled.id, &message).await;

        Ok(cancelled)
    }

    pub async fn complete(&self, appointment_id: &str, actor_id: &str) -> Result<Appointment, AppointmentError> {
        self.complete_at(appointment_id, actor_id, Local::now().naive_local()).await
    }

    /// Complete against an explicit local clock reading.
    pub async fn complete_at(
        &self,
        appointment_id: &str,
        actor_id: &str,
        now: NaiveDateTime,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_as_therapist(appointment_id, actor_id).await?;

        self.lifecycle
            .validate_transition(current.status, AppointmentStatus::Completed)?;
        if current.scheduled_at() > now {
            warn!("Appointment {} completed before its start time", appointment_id);
            return Err(AppointmentError::NotYetDue);
        }

        self.transition(
            &current,
            AppointmentStatus::Completed,
            json!({ "completedAt": Utc::now() }),
        )
        .await
    }

    /// Therapist housekeeping: remove a decided appointment.
    pub async fn delete(&self, appointment_id: &str, actor_id: &str) -> Result<(), AppointmentError> {
        let current = self.get_as_therapist(appointment_id, actor_id).await?;

        if current.status == AppointmentStatus::Pending {
            return Err(AppointmentError::DeletePending);
        }

        self.store
            .delete(collections::APPOINTMENTS, appointment_id)
            .await?;

        info!("Appointment {} deleted by therapist {}", appointment_id, actor_id);
        Ok(())
    }

    pub async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        self.list_by("patientId", patient_id).await
    }

    pub async fn list_for_therapist(&self, therapist_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        self.list_by("therapistId", therapist_id).await
    }

    /// Upcoming / pending / past buckets for the caller's side of their appointments.
    pub async fn partition_for(
        &self,
        user_id: &str,
        as_therapist: bool,
    ) -> Result<AppointmentBuckets, AppointmentError> {
        let appointments = if as_therapist {
            self.list_for_therapist(user_id).await?
        } else {
            self.list_for_patient(user_id).await?
        };
        Ok(self.lifecycle.partition(appointments, Local::now().naive_local()))
    }

    /// Move `current` to `to`, provided the stored status still equals
    /// `current.status`. `extra` is merged into the same write.
    pub async fn transition(
        &self,
        current: &Appointment,
        to: AppointmentStatus,
        extra: Value,
    ) -> Result<Appointment, AppointmentError> {
        self.lifecycle.validate_transition(current.status, to)?;

        let mut patch = extra;
        patch["status"] = json!(to);
        patch["updatedAt"] = json!(Utc::now());

        let updated = self
            .store
            .update_if(
                collections::APPOINTMENTS,
                &current.id,
                "status",
                &json!(current.status),
                patch,
            )
            .await?;

        match updated {
            Some(doc) => {
                info!("Appointment {} moved from {} to {}", current.id, current.status, to);
                Ok(doc.parse()?)
            }
            None => {
                warn!(
                    "Appointment {} changed while moving from {} to {}",
                    current.id, current.status, to
                );
                Err(AppointmentError::ConcurrentModification)
            }
        }
    }

    async fn get_as_therapist(
        &self,
        appointment_id: &str,
        actor_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;
        if appointment.therapist_id != actor_id {
            warn!("User {} is not the therapist on appointment {}", actor_id, appointment_id);
            return Err(AppointmentError::Unauthorized);
        }
        Ok(appointment)
    }

    async fn list_by(&self, field: &str, user_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let docs = self
            .store
            .query(collections::APPOINTMENTS, &Query::new().eq(field, user_id))
            .await?;

        let mut appointments = docs
            .iter()
            .map(|doc| doc.parse::<Appointment>())
            .collect::<Result<Vec<_>, _>>()?;

        // Stable, so same-slot records keep store order.
        appointments.sort_by_key(|a| a.scheduled_at());
        Ok(appointments)
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppointmentError> {
        match self.store.get(collections::USERS, user_id).await? {
            Some(doc) => Ok(Some(doc.parse()?)),
            None => Ok(None),
        }
    }

    async fn notify_quietly(&self, user_id: &str, appointment_id: &str, message: &str) {
        if let Err(e) = self
            .notifications
            .notify_appointment(user_id, appointment_id, message)
            .await
        {
            warn!("Appointment notification to {} failed: {}", user_id, e);
        }
    }
}
