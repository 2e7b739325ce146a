//! OAuth2 credentials for the Drive API.
//!
//! [`OAuthProvider`] uses a stored token when it is still valid, refreshes it
//! when it has expired, and otherwise runs the installed-app consent flow
//! (loopback redirect on `127.0.0.1`, PKCE S256, random `state`). The token
//! is persisted as JSON with owner-only permissions.

mod consent;
mod error;
mod provider;
mod secret;
mod token;

pub use consent::{Pkce, consent_url, random_token};
pub use error::AuthError;
pub use provider::{
    AccessToken, AuthSettings, ConsentPrompt, DEFAULT_CONSENT_TIMEOUT, DRIVE_READONLY_SCOPE,
    DRIVE_SCOPE, OAuthProvider, scopes_for,
};
pub use secret::{ClientSecret, DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI};
pub use token::{EXPIRY_SKEW_SECS, StoredToken, TokenResponse};
