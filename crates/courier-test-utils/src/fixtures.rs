//! Credential artifact fixtures.

use courier_session::{Cookie, StorageState};
use std::io::Write;
use tempfile::NamedTempFile;

fn cookie(expires: f64) -> Cookie {
    Cookie {
        name: "sid".to_string(),
        value: "fixture".to_string(),
        domain: ".platform.example".to_string(),
        path: "/".to_string(),
        expires,
        http_only: true,
        secure: true,
        same_site: "Lax".to_string(),
    }
}

/// Artifact with one live session cookie.
#[must_use]
pub fn fresh_storage_state() -> StorageState {
    StorageState {
        cookies: vec![cookie(-1.0)],
        origins: vec![],
    }
}

/// Artifact whose every cookie is long past expiry.
#[must_use]
pub fn expired_storage_state() -> StorageState {
    StorageState {
        cookies: vec![cookie(100.0)],
        origins: vec![],
    }
}

/// Write an artifact to a temp file; the file lives as long as the handle.
#[must_use]
pub fn write_artifact(state: &StorageState) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    let json = serde_json::to_string_pretty(state).expect("artifact serializes");
    write!(file, "{json}").expect("artifact written");
    file
}
