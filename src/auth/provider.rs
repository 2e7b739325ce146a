//! The credential provider: stored token, refresh, or interactive consent.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::consent::{Pkce, await_redirect, consent_url, random_token};
use super::{AuthError, ClientSecret, StoredToken, TokenResponse};
use crate::http::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS, build_request_client};

/// Full Drive access; needed to delete files after download.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Read-only Drive access.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Default time to wait for the browser redirect.
pub const DEFAULT_CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Returns the scope list a run needs.
#[must_use]
pub fn scopes_for(delete_after: bool) -> Vec<String> {
    let scope = if delete_after {
        DRIVE_SCOPE
    } else {
        DRIVE_READONLY_SCOPE
    };
    vec![scope.to_string()]
}

/// Bearer token handed to the Drive client.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token. Sensitive; never log it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Where credentials live and what they must grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// `client_secret.json` from the Google Cloud console.
    pub client_secret_path: PathBuf,
    /// Token cache written after every successful authentication.
    pub token_path: PathBuf,
    /// Required scopes.
    pub scopes: Vec<String>,
}

impl AuthSettings {
    /// Creates settings requesting the scopes `delete_after` needs.
    #[must_use]
    pub fn new(
        client_secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
        delete_after: bool,
    ) -> Self {
        Self {
            client_secret_path: client_secret_path.into(),
            token_path: token_path.into(),
            scopes: scopes_for(delete_after),
        }
    }
}

/// Callback that shows the consent URL to the user.
pub type ConsentPrompt = Arc<dyn Fn(&Url) + Send + Sync>;

/// OAuth2 installed-app credential provider.
pub struct OAuthProvider {
    settings: AuthSettings,
    client: Client,
    consent_timeout: Duration,
    prompt: ConsentPrompt,
}

impl fmt::Debug for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthProvider")
            .field("settings", &self.settings)
            .field("consent_timeout", &self.consent_timeout)
            .finish_non_exhaustive()
    }
}

impl OAuthProvider {
    /// Creates a provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Network`] if the HTTP client cannot be built.
    pub fn new(settings: AuthSettings) -> Result<Self, AuthError> {
        let client = build_request_client(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
        .map_err(|e| AuthError::network("building HTTP client", e))?;
        Ok(Self {
            settings,
            client,
            consent_timeout: DEFAULT_CONSENT_TIMEOUT,
            prompt: Arc::new(|url: &Url| {
                info!(url = %url, "open this URL in a browser to authorize access");
            }),
        })
    }

    /// Overrides how long the interactive flow waits for the redirect.
    #[must_use]
    pub fn with_consent_timeout(mut self, timeout: Duration) -> Self {
        self.consent_timeout = timeout;
        self
    }

    /// Overrides how the consent URL is shown.
    #[must_use]
    pub fn with_consent_prompt(mut self, prompt: ConsentPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Produces a usable access token.
    ///
    /// Order: stored token still valid, then refresh, then interactive consent.
    /// A failed refresh falls through to consent. The resulting token is
    /// persisted; a failed write is logged and does not fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when no token can be obtained.
    #[instrument(skip(self), fields(token = %self.settings.token_path.display()))]
    pub async fn authenticate(&self) -> Result<AccessToken, AuthError> {
        let secret = ClientSecret::load(&self.settings.client_secret_path)?;

        let stored = match StoredToken::load(&self.settings.token_path) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable token file");
                None
            }
        };

        if let Some(stored) = stored {
            if !stored.covers_scopes(&self.settings.scopes) {
                info!("stored credentials lack required scopes, re-authorizing");
            } else if stored.is_valid_at(Utc::now()) {
                info!("using stored credentials");
                return Ok(AccessToken::new(stored.access_token()));
            } else if let Some(refresh_token) = stored.refresh_token() {
                match self.refresh(&secret, refresh_token, &stored.scopes).await {
                    Ok(token) => {
                        info!("refreshed expired credentials");
                        return Ok(self.persist(token));
                    }
                    Err(e) => warn!(error = %e, "token refresh failed, re-authorizing"),
                }
            } else {
                debug!("stored credentials expired without a refresh token");
            }
        }

        let token = self.interactive(&secret).await?;
        info!("authorization complete");
        Ok(self.persist(token))
    }

    /// Removes the persisted token. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Io`] if the file exists but cannot be removed.
    pub fn cleanup(&self) -> Result<(), AuthError> {
        let path = &self.settings.token_path;
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "removed stored credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored credentials to remove");
                Ok(())
            }
            Err(e) => Err(AuthError::io(path, e)),
        }
    }

    /// Refreshes the access token. Scopes default to those of the stored
    /// token when the response omits them.
    async fn refresh(
        &self,
        secret: &ClientSecret,
        refresh_token: &str,
        stored_scopes: &[String],
    ) -> Result<StoredToken, AuthError> {
        debug!("refreshing access token");
        let response = self
            .post_token(
                &secret.token_uri,
                &[
                    ("client_id", secret.client_id.as_str()),
                    ("client_secret", secret.secret()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;
        Ok(StoredToken::from_response(
            response,
            Some(refresh_token.to_string()),
            stored_scopes,
            Utc::now(),
        ))
    }

    async fn interactive(&self, secret: &ClientSecret) -> Result<StoredToken, AuthError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| AuthError::io("127.0.0.1:0", e))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::io("loopback listener", e))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");

        let state = random_token(16);
        let pkce = Pkce::generate();
        let url = consent_url(secret, &redirect_uri, &self.settings.scopes, &state, &pkce)?;
        (self.prompt)(&url);

        let code = await_redirect(listener, &state, self.consent_timeout).await?;
        debug!("received authorization code");

        let response = self
            .post_token(
                &secret.token_uri,
                &[
                    ("code", code.as_str()),
                    ("client_id", secret.client_id.as_str()),
                    ("client_secret", secret.secret()),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("grant_type", "authorization_code"),
                    ("code_verifier", pkce.verifier()),
                ],
            )
            .await?;
        Ok(StoredToken::from_response(
            response,
            None,
            &self.settings.scopes,
            Utc::now(),
        ))
    }

    async fn post_token(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        let response = self
            .client
            .post(token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::network("token request", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::network("reading token response", e))?;
        if !status.is_success() {
            return Err(AuthError::token_endpoint(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|e| AuthError::json("token response", e))
    }

    fn persist(&self, token: StoredToken) -> AccessToken {
        if let Err(e) = token.save(&self.settings.token_path) {
            warn!(error = %e, "failed to save credentials; next run will re-authorize");
        } else {
            debug!(path = %self.settings.token_path.display(), "saved credentials");
        }
        AccessToken::new(token.access_token())
    }
}
