//! Test utilities shared by the handler integration tests.

use axum::http::header;
use axum_test::TestServer;
use sqlx::PgPool;

use crate::{
    api::models::auth::SessionResponse,
    auth::password,
    config::{Config, WindowConfig},
    db::{
        handlers::{Repository, users::Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
};

/// Build a test server around the pool that `#[sqlx::test]` provisioned.
pub async fn create_test_app(pool: PgPool) -> TestServer {
    let config = create_test_config();
    let app = crate::Application::new_with_pool(config, pool).expect("Failed to create application");
    app.into_test_server()
}

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("calisound-test-emails-{}", std::process::id()));

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@calisound.example".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        session: crate::config::SessionConfig {
            secure: false,
            ..Default::default()
        },
        limits: crate::config::LimitsConfig {
            // Tests exercise the comment window explicitly; the others stay
            // roomy so unrelated tests never trip them
            login: WindowConfig {
                max_requests: 100,
                window_secs: 60,
            },
            comments: WindowConfig {
                max_requests: 5,
                window_secs: 60,
            },
            contact: WindowConfig {
                max_requests: 100,
                window_secs: 60,
            },
        },
        email: crate::config::EmailConfig {
            transport: crate::config::EmailTransportConfig::File {
                path: temp_dir.to_string_lossy().to_string(),
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Insert an admin user directly, bypassing the API.
pub async fn create_admin_user(pool: &PgPool, email: &str, password: &str) -> UserDBResponse {
    let password_hash = password::hash_string(password).expect("hash password");
    let mut conn = pool.acquire().await.expect("acquire connection");
    let mut users = Users::new(&mut conn);
    users
        .create(&UserCreateDBRequest {
            username: email.to_string(),
            email: email.to_string(),
            display_name: None,
            is_admin: true,
            password_hash: Some(password_hash),
        })
        .await
        .expect("create admin user")
}

/// A logged-in admin session: the cookie pair plus the CSRF token.
pub struct AdminSession {
    pub cookie: String,
    pub csrf_token: String,
    pub session: SessionResponse,
}

/// Log in through the API and install the session cookie and CSRF header on
/// the server so subsequent requests are authenticated.
pub async fn login_admin(server: &mut TestServer, email: &str, password: &str) -> AdminSession {
    let response = server
        .post("/authentication/login")
        .json(&serde_json::json!({"email": email, "password": password}))
        .await;
    response.assert_status_ok();

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets a session cookie")
        .to_str()
        .expect("cookie is valid UTF-8");
    // Only the name=value pair matters for replaying the cookie
    let cookie = set_cookie.split(';').next().expect("cookie pair").to_string();

    let session: SessionResponse = response.json();
    let csrf_token = session.csrf_token.clone();

    server.add_header(header::COOKIE, cookie.clone());
    server.add_header("x-csrf-token", csrf_token.clone());

    AdminSession {
        cookie,
        csrf_token,
        session,
    }
}

/// Attach just the session cookie, without the CSRF header.
pub fn add_session_cookie(server: &mut TestServer, session: &AdminSession) {
    server.add_header(header::COOKIE, session.cookie.clone());
}
