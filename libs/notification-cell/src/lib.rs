//! # Notification Cell
//!
//! Notifications are side effects of other records changing: a booking, a
//! chat message, a video call invitation. Each one lands in `notifications`
//! and bumps the recipient's `unreadNotifications` counter.
//!
//! The counter is incremented atomically on insert and recomputed from the
//! `read` flags whenever notifications are marked read, so drift never
//! survives the recipient opening their list.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Notification, NotificationData, NotificationError, NotificationType};
pub use router::notification_routes;
pub use services::emitter::NotificationService;
