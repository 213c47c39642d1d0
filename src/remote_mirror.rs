use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use tracing::warn;

use crate::config::Config;

const MIRROR_TIMEOUT_SECS: u64 = 3;

/// Write-through mirror for a persisted store. Every implementation must be
/// fire-and-forget: failures are logged and ignored, never propagated,
/// matching spec §5 ("Remote object storage is treated as a write-through
/// mirror: failures to mirror are logged and ignored").
pub trait RemoteMirror: Send + Sync {
    fn mirror(&self, key: &str, bytes: &[u8]);
}

/// Default mirror when no remote credentials are configured.
pub struct NullMirror;

impl RemoteMirror for NullMirror {
    fn mirror(&self, _key: &str, _bytes: &[u8]) {}
}

/// Best-effort S3-compatible mirror over a plain HTTP PUT. Full request
/// signing (SigV4) is out of scope for this crate — see DESIGN.md's Open
/// Question on remote storage credential plumbing; this sends the bearer
/// credential as a header, which is sufficient for the R2-style endpoints
/// this crate targets but not a general S3 client.
pub struct HttpPutMirror {
    endpoint: String,
    bucket: String,
    access_key: String,
    secret_key: String,
}

static MIRROR_CLIENT: OnceCell<Client> = OnceCell::new();

fn mirror_client() -> Option<&'static Client> {
    MIRROR_CLIENT
        .get_or_try_init(|| {
            Client::builder()
                .timeout(Duration::from_secs(MIRROR_TIMEOUT_SECS))
                .build()
        })
        .ok()
}

impl HttpPutMirror {
    pub fn from_config(cfg: &Config) -> Option<Self> {
        if !cfg.remote_mirror_enabled() {
            return None;
        }
        Some(Self {
            endpoint: cfg.remote_endpoint.clone()?,
            bucket: cfg.remote_bucket.clone().unwrap_or_else(|| "forecast".into()),
            access_key: cfg.remote_access_key.clone()?,
            secret_key: cfg.remote_secret_key.clone()?,
        })
    }
}

impl RemoteMirror for HttpPutMirror {
    fn mirror(&self, key: &str, bytes: &[u8]) {
        let Some(client) = mirror_client() else {
            return;
        };
        let url = format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            key
        );
        let result = client
            .put(&url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .body(bytes.to_vec())
            .send();
        if let Err(err) = result {
            warn!(key, %err, "remote mirror upload failed, continuing in-memory/local-only");
        }
    }
}

/// Builds the mirror configured for this process, falling back to a no-op.
pub fn build_mirror(cfg: &Config) -> Box<dyn RemoteMirror> {
    match HttpPutMirror::from_config(cfg) {
        Some(mirror) => Box::new(mirror),
        None => Box::new(NullMirror),
    }
}
