use std::env;

/// Environment-derived configuration. Every field here is optional in the
/// sense described by spec §6: absence of credentials or a key disables only
/// the corresponding mirror/ingest path, never the core pipeline.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub remote_endpoint: Option<String>,
    pub remote_access_key: Option<String>,
    pub remote_secret_key: Option<String>,
    pub remote_bucket: Option<String>,
    pub live_api_key: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment, having first tried
    /// to populate it from a `.env` file (teacher's `dotenvy` idiom).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            remote_endpoint: non_empty_env("REMOTE_STORAGE_ENDPOINT"),
            remote_access_key: non_empty_env("REMOTE_STORAGE_ACCESS_KEY"),
            remote_secret_key: non_empty_env("REMOTE_STORAGE_SECRET_KEY"),
            remote_bucket: non_empty_env("REMOTE_STORAGE_BUCKET"),
            live_api_key: non_empty_env("LIVE_FIXTURE_API_KEY"),
        }
    }

    pub fn remote_mirror_enabled(&self) -> bool {
        self.remote_endpoint.is_some()
            && self.remote_access_key.is_some()
            && self.remote_secret_key.is_some()
    }

    pub fn live_api_enabled(&self) -> bool {
        self.live_api_key.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Installs the process-wide tracing subscriber, reading level filters from
/// `RUST_LOG` (defaulting to `info`), matching the teacher-sibling crate's
/// `tracing-subscriber` + `EnvFilter` wiring.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
