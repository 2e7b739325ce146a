//! Persisted OAuth token (`token.json`).

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthError, DRIVE_READONLY_SCOPE, DRIVE_SCOPE};

/// Tokens expiring sooner than this are treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Token state stored between runs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// When the access token stops working.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Scopes the token was granted for.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    /// Creates a token record.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expiry: Option<DateTime<Utc>>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expiry,
            scopes,
        }
    }

    /// Builds a token from an endpoint response received at `now`.
    ///
    /// When the response omits a refresh token, `previous_refresh` is kept.
    #[must_use]
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        scopes: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let expiry = response
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime));
        let scopes = response
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| scopes.to_vec());
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expiry,
            scopes,
        }
    }

    /// Returns the bearer token. Sensitive; never log it.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token, if any. Sensitive; never log it.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns true when the access token is usable at `now`.
    ///
    /// A token without an expiry is never trusted.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && self
                .expiry
                .and_then(|expiry| expiry.checked_sub_signed(Duration::seconds(EXPIRY_SKEW_SECS)))
                .is_some_and(|usable_until| usable_until > now)
    }

    /// Returns true when every scope in `required` was granted.
    ///
    /// Full Drive access implies read-only access.
    #[must_use]
    pub fn covers_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|needed| {
            self.scopes
                .iter()
                .any(|granted| scope_implies(granted, needed))
        })
    }

    /// Loads a token from `path`. Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Io`] or [`AuthError::Json`] for unreadable files.
    pub fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::io(path, e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| AuthError::json(path.display().to_string(), e))
    }

    /// Writes the token to `path` with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| AuthError::json(path.display().to_string(), e))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AuthError::io(parent, e))?;
        }
        fs::write(path, json).map_err(|e| AuthError::io(path, e))?;
        set_owner_only_permissions(path)
    }
}

fn scope_implies(granted: &str, needed: &str) -> bool {
    granted == needed || (granted == DRIVE_SCOPE && needed == DRIVE_READONLY_SCOPE)
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), AuthError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| AuthError::io(path, e))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), AuthError> {
    Ok(())
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// New access token.
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Present on the first exchange, usually absent on refresh.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Space-separated granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}
