//! # Appointment Cell
//!
//! Appointment records move `pending -> accepted | rejected | cancelled` and
//! `accepted -> cancelled | completed`. Every status change is a conditional
//! write against the status the caller read, so two actors racing on the
//! same appointment cannot both succeed.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Appointment, AppointmentError, AppointmentStatus, CancelledBy};
pub use router::appointment_routes;
pub use services::booking::AppointmentBookingService;
pub use services::lifecycle::AppointmentLifecycleService;
