//! Document store client shared by every cell.
//!
//! Collections are named, schema-less groups of JSON documents keyed by opaque
//! string ids. Cells talk to the [`DocumentStore`] trait and parse documents into
//! their own typed records at this boundary.

pub mod error;
pub mod feed;
pub mod memory;
pub mod store;
pub mod supabase;

use std::sync::Arc;

use tracing::{info, warn};

use shared_config::{AppConfig, StoreBackend};

pub use error::StoreError;
pub use feed::{ChangeFeed, Subscription};
pub use memory::MemoryStore;
pub use store::{to_fields, Document, DocumentStore, Query, SortOrder};
pub use supabase::SupabaseStore;

/// Collection names used across the cells.
pub mod collections {
    pub const USERS: &str = "users";
    pub const APPOINTMENTS: &str = "appointments";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const CHATS: &str = "chats";
    pub const CHAT_MESSAGES: &str = "chatMessages";
    pub const AVAILABILITY: &str = "availability";
    pub const THERAPIST_NOTES: &str = "therapistNotes";
}

/// Build the store selected by the configuration.
pub fn connect(config: &AppConfig) -> Arc<dyn DocumentStore> {
    match config.store_backend {
        StoreBackend::Supabase => {
            if !config.is_store_configured() {
                warn!("Supabase backend selected without URL/key; requests will fail as unavailable");
            }
            info!("Using Supabase document store at {}", config.supabase_url);
            Arc::new(SupabaseStore::new(config))
        }
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Arc::new(MemoryStore::new())
        }
    }
}
