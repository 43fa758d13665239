//! Authentication endpoints: login (with optional TOTP second step), logout,
//! session introspection, TOTP enrolment, and password change.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    api::models::auth::{
        AuthMessageResponse, CurrentUser, LoginRequest, PasswordChangeRequest, SessionResponse, TotpChallengeResponse,
        TotpEnableRequest, TotpSetupResponse, TotpVerifyRequest, UserResponse,
    },
    auth::{password, session, totp},
    config::Config,
    db::{
        handlers::{Repository, users::Users},
        models::users::{UserDBResponse, UserUpdateDBRequest},
    },
    errors::Error,
    limits::client_ip,
};

/// Session body plus the Set-Cookie header that carries the JWT.
pub struct SessionWithCookie {
    pub session: SessionResponse,
    pub cookie: String,
}

impl IntoResponse for SessionWithCookie {
    fn into_response(self) -> Response {
        ([(header::SET_COOKIE, self.cookie)], Json(self.session)).into_response()
    }
}

/// Outcome of the password step: either a full session or a TOTP challenge.
pub enum LoginResponse {
    Session(Box<SessionWithCookie>),
    TotpChallenge(TotpChallengeResponse),
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        match self {
            LoginResponse::Session(session) => session.into_response(),
            LoginResponse::TotpChallenge(challenge) => (StatusCode::ACCEPTED, Json(challenge)).into_response(),
        }
    }
}

fn create_session_cookie(token: &str, config: &Config) -> String {
    let session = &config.session;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        session.cookie_name,
        token,
        session.expiry.as_secs()
    );
    if session.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_session_cookie(config: &Config) -> String {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0", config.session.cookie_name);
    if config.session.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

/// Mint a session token with a fresh CSRF token and wrap it in a cookie.
fn issue_session(user: UserDBResponse, config: &Config) -> Result<SessionWithCookie, Error> {
    let csrf_token = session::generate_csrf_token();
    let current_user = CurrentUser {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        is_admin: user.is_admin,
        csrf_token: csrf_token.clone(),
    };
    let token = session::create_session_token(&current_user, config)?;
    let cookie = create_session_cookie(&token, config);

    Ok(SessionWithCookie {
        session: SessionResponse {
            user: UserResponse::from(user),
            csrf_token,
        },
        cookie,
    })
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 202, description = "TOTP code required to finish login", body = TotpChallengeResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<LoginResponse, Error> {
    state.limiter.check("login", &client_ip(&headers), &state.config.limits.login)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo.get_by_email(&request.email).await?.ok_or_else(invalid_credentials)?;
    let password_hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;

    // Verify the password on a blocking thread, argon2 is deliberately slow
    let password = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(invalid_credentials());
    }

    // The password alone is not enough when TOTP is on. Hand out a short-lived
    // pending token and let the TOTP step finish the login.
    if user.totp_enabled && user.totp_secret.is_some() {
        let pending_user = CurrentUser {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
            csrf_token: String::new(),
        };
        let pending_token = session::create_pending_token(&pending_user, &state.config)?;
        return Ok(LoginResponse::TotpChallenge(TotpChallengeResponse {
            totp_required: true,
            pending_token,
        }));
    }

    Ok(LoginResponse::Session(Box::new(issue_session(user, &state.config)?)))
}

/// Finish a TOTP login with the pending token and a code
#[utoipa::path(
    post,
    path = "/authentication/totp",
    request_body = TotpVerifyRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 401, description = "Invalid pending token or code"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn verify_totp(
    State(state): State<AppState>,
    Json(request): Json<TotpVerifyRequest>,
) -> Result<SessionWithCookie, Error> {
    let pending = session::verify_pending_token(&request.pending_token, &state.config)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo.get_by_id(pending.id).await?.ok_or_else(invalid_credentials)?;
    let secret = user.totp_secret.clone().filter(|_| user.totp_enabled).ok_or_else(|| Error::Unauthenticated {
        message: Some("TOTP is not enabled for this account".to_string()),
    })?;

    if !totp::verify_code_now(&secret, &request.code)? {
        return Err(Error::Unauthenticated {
            message: Some("Invalid TOTP code".to_string()),
        });
    }

    issue_session(user, &state.config)
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthMessageResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<Response, Error> {
    let cookie = clear_session_cookie(&state.config);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthMessageResponse {
            message: "Logout successful".to_string(),
        }),
    )
        .into_response())
}

/// Current session and user profile
#[utoipa::path(
    get,
    path = "/authentication/me",
    tag = "authentication",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<SessionResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let db_user = user_repo
        .get_by_id(user.id)
        .await?
        .ok_or(Error::Unauthenticated { message: None })?;

    Ok(Json(SessionResponse {
        user: UserResponse::from(db_user),
        csrf_token: user.csrf_token,
    }))
}

/// Start TOTP enrolment: generate a secret and return the otpauth URI
#[utoipa::path(
    post,
    path = "/authentication/totp/enroll",
    tag = "authentication",
    responses(
        (status = 200, description = "Secret generated, waiting for confirmation", body = TotpSetupResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn enroll_totp(State(state): State<AppState>, user: CurrentUser) -> Result<Json<TotpSetupResponse>, Error> {
    let secret = totp::generate_secret();

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    // Store the secret but keep TOTP off until a first valid code confirms
    // the authenticator app actually has it
    user_repo
        .update(
            user.id,
            &UserUpdateDBRequest {
                display_name: None,
                password_hash: None,
                totp_secret: Some(Some(secret.clone())),
                totp_enabled: Some(false),
            },
        )
        .await?;

    let otpauth_url = totp::otpauth_url(&state.config.totp.issuer, &user.email, &secret)?;
    Ok(Json(TotpSetupResponse { secret, otpauth_url }))
}

/// Confirm TOTP enrolment with one valid code
#[utoipa::path(
    post,
    path = "/authentication/totp/confirm",
    request_body = TotpEnableRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "TOTP enabled", body = AuthMessageResponse),
        (status = 400, description = "No enrolment in progress or invalid code"),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn confirm_totp(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<TotpEnableRequest>,
) -> Result<Json<AuthMessageResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let db_user = user_repo
        .get_by_id(user.id)
        .await?
        .ok_or(Error::Unauthenticated { message: None })?;
    let secret = db_user.totp_secret.ok_or_else(|| Error::BadRequest {
        message: "No TOTP enrolment to confirm".to_string(),
    })?;

    if !totp::verify_code_now(&secret, &request.code)? {
        return Err(Error::BadRequest {
            message: "Invalid TOTP code".to_string(),
        });
    }

    user_repo
        .update(
            user.id,
            &UserUpdateDBRequest {
                display_name: None,
                password_hash: None,
                totp_secret: None,
                totp_enabled: Some(true),
            },
        )
        .await?;

    Ok(Json(AuthMessageResponse {
        message: "TOTP enabled".to_string(),
    }))
}

/// Disable TOTP for the current user
#[utoipa::path(
    delete,
    path = "/authentication/totp",
    tag = "authentication",
    responses(
        (status = 200, description = "TOTP disabled", body = AuthMessageResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn disable_totp(State(state): State<AppState>, user: CurrentUser) -> Result<Json<AuthMessageResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    user_repo
        .update(
            user.id,
            &UserUpdateDBRequest {
                display_name: None,
                password_hash: None,
                totp_secret: Some(None),
                totp_enabled: Some(false),
            },
        )
        .await?;

    Ok(Json(AuthMessageResponse {
        message: "TOTP disabled".to_string(),
    }))
}

/// Change password for the authenticated user
#[utoipa::path(
    post,
    path = "/authentication/password-change",
    request_body = PasswordChangeRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Password changed successfully", body = AuthMessageResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Current password is incorrect"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<PasswordChangeRequest>,
) -> Result<Json<AuthMessageResponse>, Error> {
    if request.new_password.len() < 8 {
        return Err(Error::BadRequest {
            message: "Password must be at least 8 characters".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let db_user = user_repo
        .get_by_id(user.id)
        .await?
        .ok_or(Error::Unauthenticated { message: None })?;
    let password_hash = db_user.password_hash.ok_or_else(|| Error::BadRequest {
        message: "Account has no password set".to_string(),
    })?;

    let current_password = request.current_password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&current_password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    let new_password_hash = tokio::task::spawn_blocking({
        let password = request.new_password.clone();
        move || password::hash_string(&password)
    })
    .await
    .map_err(|e| Error::Internal {
        operation: format!("spawn password hashing task: {e}"),
    })??;

    user_repo
        .update(
            user.id,
            &UserUpdateDBRequest {
                display_name: None,
                password_hash: Some(new_password_hash),
                totp_secret: None,
                totp_enabled: None,
            },
        )
        .await?;

    Ok(Json(AuthMessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_admin_user, create_test_app, login_admin};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_sets_cookie_and_returns_csrf(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "ada@example.com", "correct horse battery").await;

        let response = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": "ada@example.com", "password": "correct horse battery"}))
            .await;

        response.assert_status_ok();
        let cookie = response.headers().get("set-cookie").expect("session cookie").to_str().unwrap();
        assert!(cookie.contains("HttpOnly"));

        let body: SessionResponse = response.json();
        assert_eq!(body.user.email, "ada@example.com");
        assert!(!body.csrf_token.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_rejects_wrong_password(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "ada@example.com", "correct horse battery").await;

        let response = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": "ada@example.com", "password": "wrong"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": "nobody@example.com", "password": "wrong"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_totp_two_step_login(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_admin_user(&pool, "ada@example.com", "correct horse battery").await;

        // Enable TOTP directly in the database
        let secret = totp::generate_secret();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        repo.update(
            user.id,
            &UserUpdateDBRequest {
                display_name: None,
                password_hash: None,
                totp_secret: Some(Some(secret.clone())),
                totp_enabled: Some(true),
            },
        )
        .await
        .unwrap();

        // Password step returns a challenge, not a session
        let response = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": "ada@example.com", "password": "correct horse battery"}))
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        assert!(response.headers().get("set-cookie").is_none());
        let challenge: TotpChallengeResponse = response.json();
        assert!(challenge.totp_required);

        // A wrong code is rejected
        let response = server
            .post("/authentication/totp")
            .json(&serde_json::json!({"pending_token": challenge.pending_token, "code": "000000"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        // The current code finishes the login
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let code = totp::code_at(&secret, now).unwrap();
        let response = server
            .post("/authentication/totp")
            .json(&serde_json::json!({"pending_token": challenge.pending_token, "code": code}))
            .await;
        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_me_requires_session(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let response = server.get("/authentication/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_totp_enrolment_flow(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "ada@example.com", "correct horse battery").await;
        login_admin(&mut server, "ada@example.com", "correct horse battery").await;

        let response = server.post("/authentication/totp/enroll").await;
        response.assert_status_ok();
        let setup: TotpSetupResponse = response.json();
        assert!(setup.otpauth_url.starts_with("otpauth://totp/"));

        // Confirming with a bad code leaves TOTP off
        let response = server
            .post("/authentication/totp/confirm")
            .json(&serde_json::json!({"code": "000000"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let code = totp::code_at(&setup.secret, now).unwrap();
        let response = server
            .post("/authentication/totp/confirm")
            .json(&serde_json::json!({"code": code}))
            .await;
        response.assert_status_ok();

        let me: SessionResponse = server.get("/authentication/me").await.json();
        assert!(me.user.totp_enabled);

        // And turn it back off
        let response = server.delete("/authentication/totp").await;
        response.assert_status_ok();
        let me: SessionResponse = server.get("/authentication/me").await.json();
        assert!(!me.user.totp_enabled);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_change_password(pool: PgPool) {
        let mut server = create_test_app(pool.clone()).await;
        create_admin_user(&pool, "ada@example.com", "correct horse battery").await;
        login_admin(&mut server, "ada@example.com", "correct horse battery").await;

        // Wrong current password
        let response = server
            .post("/authentication/password-change")
            .json(&serde_json::json!({"current_password": "wrong", "new_password": "a new password"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        // Too short
        let response = server
            .post("/authentication/password-change")
            .json(&serde_json::json!({"current_password": "correct horse battery", "new_password": "short"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/authentication/password-change")
            .json(&serde_json::json!({"current_password": "correct horse battery", "new_password": "a new password"}))
            .await;
        response.assert_status_ok();

        // The new password logs in
        let fresh = create_test_app(pool.clone()).await;
        let response = fresh
            .post("/authentication/login")
            .json(&serde_json::json!({"email": "ada@example.com", "password": "a new password"}))
            .await;
        response.assert_status_ok();
    }
}
