//! # Availability Cell
//!
//! Bookable times per therapist and day. Stored slots win; a day with no
//! stored slots gets a generated half-hour grid from 9:00 to 16:30, which is
//! saved on first access unless `PERSIST_GENERATED_SLOTS=false`.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AvailabilityError, AvailabilitySlot};
pub use router::availability_routes;
pub use services::slots::{AvailabilityService, SlotRng};
