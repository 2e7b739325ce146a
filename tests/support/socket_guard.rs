//! Skips wiremock-based tests in sandboxes that cannot bind localhost.

use std::net::TcpListener;

use wiremock::MockServer;

const REQUIRE_SOCKETS_ENV: &str = "DRIVEFETCH_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_SOCKETS_ENV)
        .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Returns true when a localhost socket can be bound. Otherwise explains the
/// skip on stderr, or panics when sockets are required.
#[track_caller]
pub fn can_bind_localhost() -> bool {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return true;
    }
    let location = std::panic::Location::caller();
    let message = format!(
        "[socket-bound-test] cannot bind 127.0.0.1 at {}:{}",
        location.file(),
        location.line()
    );
    assert!(!sockets_required(), "{message}; unset {REQUIRE_SOCKETS_ENV} to skip");
    eprintln!("{message}; skipping (set {REQUIRE_SOCKETS_ENV}=1 to fail instead)");
    false
}

/// Starts a wiremock server when localhost sockets are available.
#[track_caller]
pub fn mock_server_or_skip() -> impl std::future::Future<Output = Option<MockServer>> {
    let available = can_bind_localhost();
    async move {
        if available {
            Some(MockServer::start().await)
        } else {
            None
        }
    }
}
