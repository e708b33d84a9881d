//! Persisted credential artifact.
//!
//! A JSON file with a cookie list plus empty per-origin local-storage
//! placeholders, produced by the external interactive login helper and
//! consumed read-only here.

use crate::manager::SessionError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One persisted cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix seconds, or -1 for a session cookie
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: String,
}

impl Cookie {
    /// Whether the cookie is past its expiry. Session cookies (-1) never
    /// expire on disk.
    #[must_use]
    pub fn is_expired(&self, now_unix: f64) -> bool {
        self.expires >= 0.0 && self.expires < now_unix
    }
}

/// Per-origin storage placeholder; the login helper writes these empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginState {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<serde_json::Value>,
}

/// The whole credential artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

impl StorageState {
    /// Load and validate an artifact.
    ///
    /// # Errors
    /// `SessionError::AuthRequired` when the file is absent, unreadable,
    /// invalid JSON, empty of cookies, or holds only expired cookies. A
    /// stale artifact must fail fast instead of half-logging-in.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SessionError::AuthRequired {
            reason: format!("credential artifact {} unreadable: {e}", path.display()),
        })?;
        let state: Self =
            serde_json::from_str(&raw).map_err(|e| SessionError::AuthRequired {
                reason: format!("credential artifact {} invalid: {e}", path.display()),
            })?;
        state.validate()?;
        Ok(state)
    }

    /// Validate freshness.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.cookies.is_empty() {
            return Err(SessionError::AuthRequired {
                reason: "credential artifact holds no cookies".to_string(),
            });
        }
        let now = Utc::now().timestamp() as f64;
        if self.cookies.iter().all(|c| c.is_expired(now)) {
            return Err(SessionError::AuthRequired {
                reason: "all persisted cookies are expired".to_string(),
            });
        }
        Ok(())
    }

    /// Cookies that are still live.
    #[must_use]
    pub fn live_cookies(&self) -> Vec<&Cookie> {
        let now = Utc::now().timestamp() as f64;
        self.cookies.iter().filter(|c| !c.is_expired(now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cookie(name: &str, expires: f64) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: "v".to_string(),
            domain: ".platform.example".to_string(),
            path: "/".to_string(),
            expires,
            http_only: true,
            secure: true,
            same_site: "Lax".to_string(),
        }
    }

    #[test]
    fn session_cookie_never_expires() {
        assert!(!cookie("sid", -1.0).is_expired(2_000_000_000.0));
    }

    #[test]
    fn dated_cookie_expires() {
        assert!(cookie("sid", 100.0).is_expired(200.0));
        assert!(!cookie("sid", 300.0).is_expired(200.0));
    }

    #[test]
    fn missing_artifact_is_auth_required() {
        let err = StorageState::load(Path::new("/nonexistent/state.json")).unwrap_err();
        assert!(matches!(err, SessionError::AuthRequired { .. }));
    }

    #[test]
    fn invalid_json_is_auth_required() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = StorageState::load(file.path()).unwrap_err();
        assert!(matches!(err, SessionError::AuthRequired { .. }));
    }

    #[test]
    fn empty_cookie_list_is_auth_required() {
        let state = StorageState::default();
        assert!(state.validate().is_err());
    }

    #[test]
    fn all_expired_cookies_is_auth_required() {
        let state = StorageState {
            cookies: vec![cookie("sid", 100.0)],
            origins: vec![],
        };
        assert!(state.validate().is_err());
    }

    #[test]
    fn round_trips_login_helper_format() {
        let json = r#"{
            "cookies": [{
                "name": "sid", "value": "abc", "domain": ".platform.example",
                "path": "/", "expires": -1,
                "httpOnly": true, "secure": true, "sameSite": "Lax"
            }],
            "origins": []
        }"#;
        let state: StorageState = serde_json::from_str(json).unwrap();
        assert_eq!(state.cookies.len(), 1);
        assert!(state.validate().is_ok());
    }
}
