//! Integration tests for the OAuth credential provider against a mock token endpoint.

mod support;

use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use drivefetch_core::auth::{
    ConsentPrompt, DRIVE_READONLY_SCOPE, DRIVE_SCOPE, StoredToken,
};
use drivefetch_core::{AuthError, AuthSettings, OAuthProvider};
use support::socket_guard::mock_server_or_skip;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_client_secret(dir: &Path, server: &MockServer) -> std::path::PathBuf {
    let path = dir.join("client_secret.json");
    let json = serde_json::json!({
        "installed": {
            "client_id": "cid.apps.googleusercontent.com",
            "client_secret": "shh",
            "auth_uri": format!("{}/o/oauth2/auth", server.uri()),
            "token_uri": format!("{}/token", server.uri()),
            "redirect_uris": ["http://localhost"]
        }
    });
    std::fs::write(&path, serde_json::to_vec_pretty(&json).unwrap()).unwrap();
    path
}

fn seed_token(path: &Path, access: &str, refresh: Option<&str>, expires_in_secs: i64, scope: &str) {
    let token = StoredToken::new(
        access,
        refresh.map(str::to_string),
        Some(Utc::now() + ChronoDuration::seconds(expires_in_secs)),
        vec![scope.to_string()],
    );
    token.save(path).unwrap();
}

/// Prompt that plays the browser: follows the consent URL straight to the
/// loopback redirect, echoing `state` (or a forged one) with `code`.
fn browser(code: &'static str, forge_state: bool) -> ConsentPrompt {
    Arc::new(move |url: &Url| {
        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
                .unwrap()
        };
        let redirect = Url::parse(&param("redirect_uri")).unwrap();
        let state = if forge_state {
            "forged".to_string()
        } else {
            param("state")
        };
        let address = format!(
            "{}:{}",
            redirect.host_str().unwrap(),
            redirect.port().unwrap()
        );
        std::thread::spawn(move || {
            let mut stream = TcpStream::connect(address).unwrap();
            write!(
                stream,
                "GET /?state={state}&code={code}&scope=x HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n"
            )
            .unwrap();
            let mut response = String::new();
            let _ = stream.read_to_string(&mut response);
        });
    })
}

#[tokio::test]
async fn test_valid_stored_token_is_used_without_network() {
    let Some(server) = mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let secret = write_client_secret(temp.path(), &server);
    let token_path = temp.path().join("token.json");
    seed_token(&token_path, "stored-access", Some("r1"), 3600, DRIVE_READONLY_SCOPE);

    let provider = OAuthProvider::new(AuthSettings::new(secret, &token_path, false)).unwrap();
    let token = provider.authenticate().await.unwrap();

    assert_eq!(token.as_str(), "stored-access");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    let Some(server) = mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .and(body_string_contains("client_id=cid.apps.googleusercontent.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-access",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let secret = write_client_secret(temp.path(), &server);
    let token_path = temp.path().join("token.json");
    seed_token(&token_path, "stale-access", Some("r1"), -60, DRIVE_READONLY_SCOPE);

    let provider = OAuthProvider::new(AuthSettings::new(secret, &token_path, false)).unwrap();
    let token = provider.authenticate().await.unwrap();
    assert_eq!(token.as_str(), "fresh-access");

    let saved = StoredToken::load(&token_path).unwrap().unwrap();
    assert_eq!(saved.access_token(), "fresh-access");
    assert_eq!(saved.refresh_token(), Some("r1"));
    assert!(saved.is_valid_at(Utc::now()));
    assert!(saved.covers_scopes(&[DRIVE_READONLY_SCOPE.to_string()]));
}

#[tokio::test]
async fn test_full_scope_token_serves_readonly_run() {
    let Some(server) = mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let secret = write_client_secret(temp.path(), &server);
    let token_path = temp.path().join("token.json");
    seed_token(&token_path, "full-access", Some("r1"), 3600, DRIVE_SCOPE);

    // A consent prompt would panic: the stored token must be enough.
    let prompt: ConsentPrompt = Arc::new(|url: &Url| panic!("unexpected consent: {url}"));
    let provider = OAuthProvider::new(AuthSettings::new(secret, &token_path, false))
        .unwrap()
        .with_consent_prompt(prompt);
    let token = provider.authenticate().await.unwrap();

    assert_eq!(token.as_str(), "full-access");
    let saved = StoredToken::load(&token_path).unwrap().unwrap();
    assert_eq!(saved.scopes, vec![DRIVE_SCOPE.to_string()]);
}

#[tokio::test]
async fn test_readonly_refresh_keeps_full_scope_on_disk() {
    let Some(server) = mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "refreshed-full",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let secret = write_client_secret(temp.path(), &server);
    let token_path = temp.path().join("token.json");
    seed_token(&token_path, "stale-full", Some("r1"), -60, DRIVE_SCOPE);

    let provider = OAuthProvider::new(AuthSettings::new(secret, &token_path, false)).unwrap();
    assert_eq!(provider.authenticate().await.unwrap().as_str(), "refreshed-full");

    let saved = StoredToken::load(&token_path).unwrap().unwrap();
    assert!(saved.covers_scopes(&[DRIVE_SCOPE.to_string()]));
}

#[tokio::test]
async fn test_missing_token_runs_consent_flow() {
    let Some(server) = mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "consented-access",
            "refresh_token": "new-refresh",
            "expires_in": 3600,
            "scope": DRIVE_SCOPE
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let secret = write_client_secret(temp.path(), &server);
    let token_path = temp.path().join("creds").join("token.json");

    let provider = OAuthProvider::new(AuthSettings::new(secret, &token_path, true))
        .unwrap()
        .with_consent_timeout(Duration::from_secs(10))
        .with_consent_prompt(browser("auth-code-1", false));
    let token = provider.authenticate().await.unwrap();
    assert_eq!(token.as_str(), "consented-access");

    let saved = StoredToken::load(&token_path).unwrap().unwrap();
    assert_eq!(saved.refresh_token(), Some("new-refresh"));
    assert_eq!(saved.scopes, vec![DRIVE_SCOPE.to_string()]);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&token_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[tokio::test]
async fn test_scope_upgrade_reauthorizes_instead_of_refreshing() {
    let Some(server) = mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "full-access",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let secret = write_client_secret(temp.path(), &server);
    let token_path = temp.path().join("token.json");
    seed_token(&token_path, "readonly-access", Some("r1"), 3600, DRIVE_READONLY_SCOPE);

    let provider = OAuthProvider::new(AuthSettings::new(secret, &token_path, true))
        .unwrap()
        .with_consent_timeout(Duration::from_secs(10))
        .with_consent_prompt(browser("auth-code-2", false));
    let token = provider.authenticate().await.unwrap();

    assert_eq!(token.as_str(), "full-access");
    let saved = StoredToken::load(&token_path).unwrap().unwrap();
    assert!(saved.covers_scopes(&[DRIVE_SCOPE.to_string()]));
}

#[tokio::test]
async fn test_failed_refresh_falls_back_to_consent() {
    let Some(server) = mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "after-consent",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let secret = write_client_secret(temp.path(), &server);
    let token_path = temp.path().join("token.json");
    seed_token(&token_path, "stale", Some("revoked"), -3600, DRIVE_READONLY_SCOPE);

    let provider = OAuthProvider::new(AuthSettings::new(secret, &token_path, false))
        .unwrap()
        .with_consent_timeout(Duration::from_secs(10))
        .with_consent_prompt(browser("auth-code-3", false));

    assert_eq!(provider.authenticate().await.unwrap().as_str(), "after-consent");
}

#[tokio::test]
async fn test_forged_state_is_rejected() {
    let Some(server) = mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let secret = write_client_secret(temp.path(), &server);
    let token_path = temp.path().join("token.json");

    let provider = OAuthProvider::new(AuthSettings::new(secret, &token_path, false))
        .unwrap()
        .with_consent_timeout(Duration::from_secs(10))
        .with_consent_prompt(browser("auth-code-4", true));
    let err = provider.authenticate().await.unwrap_err();

    assert!(matches!(err, AuthError::StateMismatch), "{err:?}");
    assert!(!token_path.exists());
}

#[tokio::test]
async fn test_token_endpoint_error_surfaces_status() {
    let Some(server) = mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error": "invalid_client"}"#))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let secret = write_client_secret(temp.path(), &server);
    let token_path = temp.path().join("token.json");

    let provider = OAuthProvider::new(AuthSettings::new(secret, &token_path, false))
        .unwrap()
        .with_consent_timeout(Duration::from_secs(10))
        .with_consent_prompt(browser("auth-code-5", false));
    let err = provider.authenticate().await.unwrap_err();

    assert!(
        matches!(err, AuthError::TokenEndpoint { status: 401, .. }),
        "{err:?}"
    );
    assert!(err.to_string().contains("invalid_client"), "{err}");
}
