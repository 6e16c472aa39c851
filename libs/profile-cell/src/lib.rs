//! # Profile Cell
//!
//! The caller's own `users/{id}` record: created from token claims on first
//! use, renamed by its owner, and filled in by therapists for the directory.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ProfileError, ProfileView, TherapistProfileUpdate, UpdateProfileRequest};
pub use router::profile_routes;
pub use services::profiles::ProfileService;
