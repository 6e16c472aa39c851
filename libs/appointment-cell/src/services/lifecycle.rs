// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentBuckets, AppointmentError, AppointmentStatus};

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_transition(
        &self,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", from, to);

        if !self.valid_transitions(from).contains(&to) {
            warn!("Invalid status transition attempted: {} -> {}", from, to);
            return Err(AppointmentError::InvalidTransition { from, to });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn valid_transitions(&self, from: AppointmentStatus) -> Vec<AppointmentStatus> {
        match from {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Accepted,
                AppointmentStatus::Rejected,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Accepted => vec![
                AppointmentStatus::Cancelled,
                AppointmentStatus::Completed,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Rejected => vec![],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }

    /// Strictly before `now`; both sides are naive local clock readings.
    pub fn is_past_at(&self, date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool {
        date.and_time(time) < now
    }

    /// Sort by (date, time) and split into upcoming, pending and past lists.
    /// Past appointments come most recent first.
    pub fn partition(&self, mut appointments: Vec<Appointment>, now: NaiveDateTime) -> AppointmentBuckets {
        appointments.sort_by_key(|a| a.scheduled_at());

        let mut buckets = AppointmentBuckets::default();
        for appointment in appointments {
            let past = self.is_past_at(appointment.date, appointment.time, now);
            match appointment.status {
                AppointmentStatus::Pending if !past => buckets.pending.push(appointment),
                AppointmentStatus::Accepted if !past => buckets.upcoming.push(appointment),
                _ => buckets.past.push(appointment),
            }
        }
        buckets.past.reverse();

        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_time(NaiveTime::parse_from_str(time, "%H:%M").unwrap())
    }

    fn appointment(id: &str, date: &str, time: &str, status: AppointmentStatus) -> Appointment {
        let when = at(date, time);
        Appointment {
            id: id.to_string(),
            therapist_id: "t1".to_string(),
            therapist_name: "Dr. Rivera".to_string(),
            patient_id: "p1".to_string(),
            patient_name: "Sam".to_string(),
            patient_is_anonymous: false,
            date: when.date(),
            time: when.time(),
            session_type: "Video".to_string(),
            notes: None,
            status,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
            cancel_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_allowed_edges() {
        let lifecycle = AppointmentLifecycleService::new();
        use AppointmentStatus::*;

        for (from, to) in [
            (Pending, Accepted),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Accepted, Cancelled),
            (Accepted, Completed),
        ] {
            assert!(lifecycle.validate_transition(from, to).is_ok(), "{} -> {}", from, to);
        }
    }

    #[test]
    fn test_every_other_edge_is_rejected() {
        let lifecycle = AppointmentLifecycleService::new();
        use AppointmentStatus::*;
        let all = [Pending, Accepted, Rejected, Cancelled, Completed];

        for from in all {
            for to in all {
                if lifecycle.valid_transitions(from).contains(&to) {
                    continue;
                }
                assert_eq!(
                    lifecycle.validate_transition(from, to),
                    Err(AppointmentError::InvalidTransition { from, to })
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let lifecycle = AppointmentLifecycleService::new();
        for status in [AppointmentStatus::Rejected, AppointmentStatus::Cancelled, AppointmentStatus::Completed] {
            assert!(lifecycle.valid_transitions(status).is_empty());
        }
    }

    #[test]
    fn test_is_past_is_strict() {
        let lifecycle = AppointmentLifecycleService::new();
        let now = at("2025-03-10", "14:00");

        assert!(lifecycle.is_past_at(now.date(), at("2025-03-10", "13:59").time(), now));
        assert!(!lifecycle.is_past_at(now.date(), now.time(), now));
        assert!(!lifecycle.is_past_at(now.date(), at("2025-03-10", "14:01").time(), now));
    }

    #[test]
    fn test_partition_buckets() {
        let lifecycle = AppointmentLifecycleService::new();
        let now = at("2025-03-10", "12:00");

        let buckets = lifecycle.partition(
            vec![
                appointment("late", "2025-03-12", "10:00", AppointmentStatus::Accepted),
                appointment("early", "2025-03-11", "9:30", AppointmentStatus::Accepted),
                appointment("waiting", "2025-03-11", "15:00", AppointmentStatus::Pending),
                appointment("done", "2025-03-01", "10:00", AppointmentStatus::Completed),
                appointment("missed", "2025-03-09", "10:00", AppointmentStatus::Accepted),
                appointment("future-cancel", "2025-04-01", "10:00", AppointmentStatus::Cancelled),
            ],
            now,
        );

        let ids = |list: &[Appointment]| list.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&buckets.upcoming), vec!["early", "late"]);
        assert_eq!(ids(&buckets.pending), vec!["waiting"]);
        assert_eq!(ids(&buckets.past), vec!["future-cancel", "missed", "done"]);
    }

    #[test]
    fn test_clock_time_ordering_is_numeric() {
        let lifecycle = AppointmentLifecycleService::new();
        let now = at("2025-01-01", "00:00");

        let buckets = lifecycle.partition(
            vec![
                appointment("ten", "2025-03-10", "10:00", AppointmentStatus::Accepted),
                appointment("nine-thirty", "2025-03-10", "9:30", AppointmentStatus::Accepted),
            ],
            now,
        );

        assert_eq!(buckets.upcoming[0].id, "nine-thirty");
    }
}
