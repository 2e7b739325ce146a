//! Interactive consent: PKCE, consent URL and the loopback redirect listener.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};
use url::Url;

use super::{AuthError, ClientSecret};

const MAX_REQUEST_BYTES: usize = 16 * 1024;

/// How long one connection may take to send its request line.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);

const SUCCESS_PAGE: &str = "<html><body><h3>Authorization complete.</h3>\
<p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h3>Authorization failed.</h3>\
<p>Check the terminal for details.</p></body></html>";

/// PKCE verifier and its S256 challenge.
#[derive(Clone)]
pub struct Pkce {
    verifier: String,
    /// `BASE64URL(SHA256(verifier))`.
    pub challenge: String,
}

impl Pkce {
    /// Generates a fresh verifier (43 URL-safe characters) and challenge.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(random_token(32))
    }

    fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }

    /// Returns the verifier sent with the code exchange.
    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }
}

/// Random URL-safe token of `len` bytes of entropy.
#[must_use]
pub fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Builds the browser URL that asks the user for consent.
///
/// # Errors
///
/// Returns [`AuthError::ClientSecretInvalid`] when `auth_uri` is not a URL.
pub fn consent_url(
    secret: &ClientSecret,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
    pkce: &Pkce,
) -> Result<Url, AuthError> {
    let mut url = Url::parse(&secret.auth_uri).map_err(|e| {
        AuthError::client_secret_invalid("auth_uri", format!("{}: {e}", secret.auth_uri))
    })?;
    url.query_pairs_mut()
        .append_pair("client_id", &secret.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &scopes.join(" "))
        .append_pair("state", state)
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    Ok(url)
}

/// What one redirect request carried.
#[derive(Debug, PartialEq, Eq)]
enum Redirect {
    /// Not the redirect (favicon and friends).
    Unrelated,
    /// The authorization server's answer.
    Callback {
        code: Option<String>,
        state: Option<String>,
        error: Option<String>,
    },
}

/// Waits for the browser redirect on `listener` and returns the authorization code.
///
/// Unrelated requests are answered with 404 and ignored.
///
/// # Errors
///
/// Returns [`AuthError::StateMismatch`], [`AuthError::Consent`] or
/// [`AuthError::ConsentTimeout`].
pub async fn await_redirect(
    listener: TcpListener,
    expected_state: &str,
    timeout: Duration,
) -> Result<String, AuthError> {
    tokio::time::timeout(
        timeout,
        accept_redirect(&listener, expected_state, REQUEST_READ_TIMEOUT),
    )
        .await
        .map_err(|_| AuthError::ConsentTimeout {
            seconds: timeout.as_secs(),
        })?
}

async fn accept_redirect(
    listener: &TcpListener,
    expected_state: &str,
    read_timeout: Duration,
) -> Result<String, AuthError> {
    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .map_err(|e| AuthError::io("loopback listener", e))?;
        debug!(%peer, "redirect connection");

        let request_line =
            match tokio::time::timeout(read_timeout, read_request_line(&mut stream)).await {
                Ok(Ok(line)) => line,
                Ok(Err(e)) => {
                    warn!(error = %e, "unreadable request on redirect listener");
                    continue;
                }
                Err(_) => {
                    debug!(%peer, "redirect connection sent nothing, dropping it");
                    continue;
                }
            };

        match parse_redirect(&request_line) {
            Redirect::Unrelated => {
                respond(&mut stream, "404 Not Found", "").await;
            }
            Redirect::Callback {
                code,
                state,
                error,
            } => {
                let outcome = check_callback(code, state, error, expected_state);
                let (status, page) = if outcome.is_ok() {
                    ("200 OK", SUCCESS_PAGE)
                } else {
                    ("400 Bad Request", FAILURE_PAGE)
                };
                respond(&mut stream, status, page).await;
                return outcome;
            }
        }
    }
}

fn check_callback(
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    expected_state: &str,
) -> Result<String, AuthError> {
    if let Some(error) = error {
        return Err(AuthError::consent(error));
    }
    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    code.filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::consent("redirect carried no authorization code"))
}

async fn read_request_line(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if buffer.windows(2).any(|w| w == b"\r\n") || buffer.len() >= MAX_REQUEST_BYTES {
            break;
        }
    }
    let text = String::from_utf8_lossy(&buffer);
    Ok(text.lines().next().unwrap_or_default().to_string())
}

fn parse_redirect(request_line: &str) -> Redirect {
    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return Redirect::Unrelated;
    };
    let Ok(url) = Url::parse("http://127.0.0.1").and_then(|base| base.join(target)) else {
        return Redirect::Unrelated;
    };
    if url.path() != "/" {
        return Redirect::Unrelated;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }
    if code.is_none() && state.is_none() && error.is_none() {
        return Redirect::Unrelated;
    }
    Redirect::Callback { code, state, error }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!(error = %e, "failed to answer redirect request");
    }
    let _ = stream.shutdown().await;
}
