//! # Therapist Cell
//!
//! The therapist directory patients browse, and the therapist's own side:
//! the roster of patients drawn from their appointments and one private
//! note per patient.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{PatientStatus, PatientSummary, TherapistError, TherapistNote};
pub use router::therapist_routes;
pub use services::directory::TherapistDirectoryService;
pub use services::roster::PatientRosterService;
