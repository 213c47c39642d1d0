use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::http_cache::app_cache_dir;

/// Write-to-temp, rename-into-place — the atomic write idiom every
/// persisted store in this crate uses (spec §5: writes occur at component
/// boundaries and are individually atomic).
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Best-effort load: missing file, unreadable file, or malformed JSON all
/// fall back to `T::default()` rather than surfacing an error — stores are
/// allowed to start cold.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let Ok(raw) = fs::read_to_string(path) else {
        return T::default();
    };
    serde_json::from_str(&raw).unwrap_or_default()
}

pub fn store_path(file_name: &str) -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(file_name))
}
