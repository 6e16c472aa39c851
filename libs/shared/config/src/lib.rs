use std::env;
use tracing::warn;

/// Which document store backend the services talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub availability_seed: Option<u64>,
    pub persist_generated_slots: bool,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            store_backend: StoreBackend::Memory,
            availability_seed: None,
            persist_generated_slots: true,
            server_port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = env::var("SUPABASE_URL")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            });
        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });
        let supabase_jwt_secret = env::var("SUPABASE_JWT_SECRET")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_JWT_SECRET not set, using empty value");
                String::new()
            });

        let store_backend = match env::var("STORE_BACKEND").ok().as_deref() {
            Some("supabase") => StoreBackend::Supabase,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                warn!("Unknown STORE_BACKEND '{}', falling back to memory", other);
                StoreBackend::Memory
            }
            None if !supabase_url.is_empty() => StoreBackend::Supabase,
            None => StoreBackend::Memory,
        };

        let availability_seed = env::var("AVAILABILITY_SEED")
            .ok()
            .and_then(|raw| match raw.parse::<u64>() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    warn!("AVAILABILITY_SEED '{}' is not a number, ignoring", raw);
                    None
                }
            });

        let persist_generated_slots = env::var("PERSIST_GENERATED_SLOTS")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let config = Self {
            supabase_url,
            supabase_anon_key,
            supabase_jwt_secret,
            store_backend,
            availability_seed,
            persist_generated_slots,
            server_port,
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Token validation needs the JWT secret; the Supabase backend also needs its URL and key.
    pub fn is_configured(&self) -> bool {
        let auth_ready = !self.supabase_jwt_secret.is_empty();
        match self.store_backend {
            StoreBackend::Memory => auth_ready,
            StoreBackend::Supabase => auth_ready && self.is_store_configured(),
        }
    }

    pub fn is_store_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}
