//! OAuth client secret file (`client_secret.json`) as downloaded from the
//! Google Cloud console.

use std::path::Path;

use serde::Deserialize;

use super::AuthError;

/// Default Google authorization endpoint.
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Default Google token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Client credentials for the installed-app flow.
#[derive(Clone, Deserialize)]
pub struct ClientSecret {
    /// OAuth client id.
    pub client_id: String,
    client_secret: String,
    /// Authorization (consent) endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct SecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Loads a client secret from `path`, accepting the `installed` or `web` layout.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ClientSecretMissing`] when the file is absent and
    /// [`AuthError::ClientSecretInvalid`] when it cannot be used.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::ClientSecretMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(AuthError::io(path, e)),
        };
        Self::parse(&contents).map_err(|reason| AuthError::client_secret_invalid(path, reason))
    }

    fn parse(contents: &str) -> Result<Self, String> {
        let file: SecretFile = serde_json::from_str(contents).map_err(|e| e.to_string())?;
        let secret = file
            .installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" client".to_string())?;
        if secret.client_id.trim().is_empty() {
            return Err("client_id is empty".to_string());
        }
        Ok(secret)
    }

    /// Returns the client secret. Sensitive; never log it.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.client_secret
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecret")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
