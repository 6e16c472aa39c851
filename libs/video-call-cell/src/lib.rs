//! # Video Call Cell
//!
//! Placeholder video calls. Inviting someone mints a call id and sends the
//! callee a `video-call` notification pointing at the join page; the media
//! session itself lives outside this backend.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{VideoCallError, VideoCallInvite};
pub use router::video_call_routes;
pub use services::invite::{join_path, VideoCallService};
