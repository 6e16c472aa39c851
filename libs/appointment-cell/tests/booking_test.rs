use assert_matches::assert_matches;
use chrono::{Duration, Local, NaiveDate};
use serde_json::json;

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::{AppointmentBookingService, AppointmentError, AppointmentStatus, CancelledBy};
use notification_cell::{NotificationData, NotificationService};
use shared_database::{collections, DocumentStore};
use shared_utils::test_utils::{TestConfig, TestUser};
use shared_utils::AppState;

struct Fixture {
    state: AppState,
    patient: TestUser,
    therapist: TestUser,
}

async fn fixture() -> Fixture {
    let state = TestConfig::default().to_state();
    let patient = TestUser::patient("p1@example.com");
    let therapist = TestUser::therapist("t1@example.com");
    patient.seed(state.store.as_ref()).await.unwrap();
    therapist.seed(state.store.as_ref()).await.unwrap();
    Fixture { state, patient, therapist }
}

fn request(therapist_id: &str, date: &str, time: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        therapist_id: therapist_id.to_string(),
        date: date.to_string(),
        time: time.to_string(),
        session_type: "Video".to_string(),
        notes: Some("First session".to_string()),
        is_anonymous: false,
    }
}

fn days_from_today(days: i64) -> String {
    (Local::now().date_naive() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

#[tokio::test]
async fn test_create_appointment_notifies_therapist() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);

    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    assert_eq!(appointment.patient_name, f.patient.name);
    assert_eq!(appointment.therapist_name, f.therapist.name);
    assert!(!appointment.id.is_empty());

    let notifications = NotificationService::new(&f.state)
        .list_for_user(&f.therapist.id, None)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].data,
        NotificationData::Appointment { appointment_id: appointment.id.clone() }
    );
}

#[tokio::test]
async fn test_anonymous_booking_hides_patient_name() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);

    let mut req = request(&f.therapist.id, "2025-03-10", "9:00");
    req.is_anonymous = true;
    let appointment = service.create_appointment(&f.patient.id, req).await.unwrap();

    assert!(appointment.patient_is_anonymous);
    assert_eq!(appointment.patient_name, "Anonymous User");
}

#[tokio::test]
async fn test_create_validates_input() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);

    assert_matches!(
        service.create_appointment(&f.patient.id, request(&f.therapist.id, "10/03/2025", "14:00")).await,
        Err(AppointmentError::InvalidDate(_))
    );
    assert_matches!(
        service.create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "2pm")).await,
        Err(AppointmentError::InvalidTime(_))
    );
    assert_matches!(
        service.create_appointment(&f.patient.id, request("nobody", "2025-03-10", "14:00")).await,
        Err(AppointmentError::TherapistNotFound)
    );
    assert_matches!(
        service.create_appointment("ghost", request(&f.therapist.id, "2025-03-10", "14:00")).await,
        Err(AppointmentError::PatientNotFound)
    );
}

#[tokio::test]
async fn test_accept_twice_is_invalid_transition() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    let accepted = service.accept(&appointment.id, &f.therapist.id).await.unwrap();
    assert_eq!(accepted.status, AppointmentStatus::Accepted);
    assert!(accepted.updated_at.is_some());

    assert_matches!(
        service.accept(&appointment.id, &f.therapist.id).await,
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Accepted,
            to: AppointmentStatus::Accepted,
        })
    );
}

#[tokio::test]
async fn test_only_the_therapist_can_accept() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    assert_matches!(
        service.accept(&appointment.id, &f.patient.id).await,
        Err(AppointmentError::Unauthorized)
    );
    assert_eq!(
        service.get_appointment(&appointment.id).await.unwrap().status,
        AppointmentStatus::Pending
    );
}

#[tokio::test]
async fn test_reject_notifies_patient() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    let rejected = service.reject(&appointment.id, &f.therapist.id).await.unwrap();
    assert_eq!(rejected.status, AppointmentStatus::Rejected);

    let inbox = NotificationService::new(&f.state)
        .list_for_user(&f.patient.id, None)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].message.contains("declined"));
}

#[tokio::test]
async fn test_patient_cancels_accepted_appointment() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();
    service.accept(&appointment.id, &f.therapist.id).await.unwrap();

    let cancelled = service
        .cancel(&appointment.id, &f.patient.id, Some("schedule conflict".to_string()))
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(CancelledBy::Patient));
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("schedule conflict"));
    assert!(cancelled.cancelled_at.is_some());

    // booking + cancellation
    let therapist_inbox = NotificationService::new(&f.state)
        .list_for_user(&f.therapist.id, None)
        .await
        .unwrap();
    assert_eq!(therapist_inbox.len(), 2);
    assert!(therapist_inbox
        .iter()
        .any(|n| n.message.ends_with(": schedule conflict")));
}

#[tokio::test]
async fn test_therapist_cancel_records_therapist() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    let cancelled = service.cancel(&appointment.id, &f.therapist.id, None).await.unwrap();
    assert_eq!(cancelled.cancelled_by, Some(CancelledBy::Therapist));
    assert!(cancelled.cancel_reason.is_none());
}

#[tokio::test]
async fn test_outsider_cannot_cancel() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    assert_matches!(
        service.cancel(&appointment.id, "someone-else", None).await,
        Err(AppointmentError::Unauthorized)
    );
}

#[tokio::test]
async fn test_complete_pending_is_invalid_transition() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    assert_matches!(
        service.complete(&appointment.id, &f.therapist.id).await,
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Pending,
            to: AppointmentStatus::Completed,
        })
    );
}

#[tokio::test]
async fn test_complete_requires_start_time_to_have_passed() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, &days_from_today(3), "10:00"))
        .await
        .unwrap();
    service.accept(&appointment.id, &f.therapist.id).await.unwrap();

    assert_matches!(
        service.complete(&appointment.id, &f.therapist.id).await,
        Err(AppointmentError::NotYetDue)
    );

    let later = appointment.scheduled_at() + Duration::hours(1);
    let completed = service
        .complete_at(&appointment.id, &f.therapist.id, later)
        .await
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert!(completed.completed_at.is_some());
}

#[tokio::test]
async fn test_stale_transition_is_concurrent_modification() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    let stale = service.get_appointment(&appointment.id).await.unwrap();
    service.accept(&appointment.id, &f.therapist.id).await.unwrap();

    assert_matches!(
        service.transition(&stale, AppointmentStatus::Rejected, json!({})).await,
        Err(AppointmentError::ConcurrentModification)
    );
    assert_eq!(
        service.get_appointment(&appointment.id).await.unwrap().status,
        AppointmentStatus::Accepted
    );
}

#[tokio::test]
async fn test_racing_accept_and_reject_have_one_winner() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    let (accepted, rejected) = tokio::join!(
        service.accept(&appointment.id, &f.therapist.id),
        service.reject(&appointment.id, &f.therapist.id),
    );

    assert_eq!(accepted.is_ok() as u8 + rejected.is_ok() as u8, 1);
    for loser in [accepted, rejected].into_iter().filter_map(Result::err) {
        assert_matches!(
            loser,
            AppointmentError::ConcurrentModification | AppointmentError::InvalidTransition { .. }
        );
    }
}

#[tokio::test]
async fn test_notification_failure_does_not_undo_transition() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    f.state.store.delete(collections::USERS, &f.patient.id).await.unwrap();

    let accepted = service.accept(&appointment.id, &f.therapist.id).await.unwrap();
    assert_eq!(accepted.status, AppointmentStatus::Accepted);
}

#[tokio::test]
async fn test_delete_rules() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();

    assert_matches!(
        service.delete(&appointment.id, &f.therapist.id).await,
        Err(AppointmentError::DeletePending)
    );

    service.reject(&appointment.id, &f.therapist.id).await.unwrap();
    assert_matches!(
        service.delete(&appointment.id, &f.patient.id).await,
        Err(AppointmentError::Unauthorized)
    );

    service.delete(&appointment.id, &f.therapist.id).await.unwrap();
    assert_matches!(
        service.get_appointment(&appointment.id).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_lists_are_ordered_by_clock_time() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);

    for (date, time) in [("2025-03-11", "9:00"), ("2025-03-10", "10:00"), ("2025-03-10", "9:30")] {
        service
            .create_appointment(&f.patient.id, request(&f.therapist.id, date, time))
            .await
            .unwrap();
    }

    let slots: Vec<String> = service
        .list_for_patient(&f.patient.id)
        .await
        .unwrap()
        .iter()
        .map(|a| a.describe_slot())
        .collect();
    assert_eq!(
        slots,
        vec!["Mar 10, 2025 at 9:30", "Mar 10, 2025 at 10:00", "Mar 11, 2025 at 9:00"]
    );

    assert_eq!(service.list_for_therapist(&f.therapist.id).await.unwrap().len(), 3);
    assert!(service.list_for_therapist(&f.patient.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_partition_for_patient() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);

    let upcoming = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, &days_from_today(2), "10:00"))
        .await
        .unwrap();
    service.accept(&upcoming.id, &f.therapist.id).await.unwrap();
    let waiting = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, &days_from_today(5), "11:00"))
        .await
        .unwrap();
    let old = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, &days_from_today(-7), "11:00"))
        .await
        .unwrap();
    service.accept(&old.id, &f.therapist.id).await.unwrap();

    let buckets = service.partition_for(&f.patient.id, false).await.unwrap();
    assert_eq!(buckets.upcoming.len(), 1);
    assert_eq!(buckets.upcoming[0].id, upcoming.id);
    assert_eq!(buckets.pending[0].id, waiting.id);
    assert_eq!(buckets.past[0].id, old.id);
}

async fn stored(service: &AppointmentBookingService, id: &str) -> serde_json::Value {
    serde_json::to_value(service.get_appointment(id).await.unwrap()).unwrap()
}

async fn book_at(service: &AppointmentBookingService, f: &Fixture, time: &str) -> String {
    service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", time))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_terminal_appointments_refuse_every_move() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);

    let rejected = book_at(&service, &f, "9:00").await;
    service.reject(&rejected, &f.therapist.id).await.unwrap();

    let cancelled = book_at(&service, &f, "10:00").await;
    service.cancel(&cancelled, &f.patient.id, Some("sick".to_string())).await.unwrap();

    let completed = book_at(&service, &f, "11:00").await;
    let accepted = service.accept(&completed, &f.therapist.id).await.unwrap();
    service
        .complete_at(&completed, &f.therapist.id, accepted.scheduled_at() + Duration::hours(2))
        .await
        .unwrap();

    for (id, from) in [
        (rejected.as_str(), AppointmentStatus::Rejected),
        (cancelled.as_str(), AppointmentStatus::Cancelled),
        (completed.as_str(), AppointmentStatus::Completed),
    ] {
        let before = stored(&service, id).await;

        assert_matches!(
            service.cancel(id, &f.patient.id, Some("again".to_string())).await,
            Err(AppointmentError::InvalidTransition { from: got, to: AppointmentStatus::Cancelled }) if got == from
        );
        assert_matches!(
            service.accept(id, &f.therapist.id).await,
            Err(AppointmentError::InvalidTransition { from: got, to: AppointmentStatus::Accepted }) if got == from
        );
        assert_matches!(
            service.reject(id, &f.therapist.id).await,
            Err(AppointmentError::InvalidTransition { from: got, to: AppointmentStatus::Rejected }) if got == from
        );

        assert_eq!(stored(&service, id).await, before, "{:?} record changed", from);
    }
}

#[tokio::test]
async fn test_accepted_cannot_be_rejected() {
    let f = fixture().await;
    let service = AppointmentBookingService::new(&f.state);
    let appointment = service
        .create_appointment(&f.patient.id, request(&f.therapist.id, "2025-03-10", "14:00"))
        .await
        .unwrap();
    service.accept(&appointment.id, &f.therapist.id).await.unwrap();
    let before = stored(&service, &appointment.id).await;

    assert_matches!(
        service.reject(&appointment.id, &f.therapist.id).await,
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Accepted,
            to: AppointmentStatus::Rejected,
        })
    );
    assert_eq!(stored(&service, &appointment.id).await, before);

    // The acceptance is the patient's only notification.
    let patient_inbox = NotificationService::new(&f.state)
        .list_for_user(&f.patient.id, None)
        .await
        .unwrap();
    assert_eq!(patient_inbox.len(), 1);
}
