//! Request extractor for the authenticated admin.

use crate::{
    AppState,
    api::models::auth::CurrentUser,
    auth::session,
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::Method, http::request::Parts};
use tracing::{instrument, trace};

/// Extract user from the JWT session cookie if present and valid.
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(user)): Valid session found and verified
/// - Some(Err(error)): Cookie header present but unreadable
#[instrument(skip(parts, config))]
fn try_jwt_session_auth(parts: &Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name {
                match session::verify_session_token(value, config) {
                    Ok(user) => return Some(Ok(user)),
                    Err(_) => {
                        // Expired or invalid tokens are expected, keep scanning
                        continue;
                    }
                }
            }
        }
    }
    None
}

/// CSRF double-check for state-changing requests: the X-CSRF-Token header must
/// match the token baked into the session claims at login.
fn check_csrf(parts: &Parts, user: &CurrentUser) -> Result<()> {
    if matches!(parts.method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(());
    }

    let header = parts
        .headers
        .get("x-csrf-token")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if header.is_empty() || header != user.csrf_token {
        return Err(Error::Forbidden {
            message: "Missing or invalid CSRF token".to_string(),
        });
    }
    Ok(())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match try_jwt_session_auth(parts, &state.config) {
            Some(Ok(user)) => {
                check_csrf(parts, &user)?;
                Ok(user)
            }
            Some(Err(e)) => Err(e),
            None => {
                trace!("No session credentials found in request");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{create_session_token, generate_csrf_token};
    use uuid::Uuid;

    fn test_config() -> crate::config::Config {
        crate::config::Config {
            secret_key: Some("test-secret-key".to_string()),
            ..Default::default()
        }
    }

    fn test_user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            is_admin: true,
            csrf_token: generate_csrf_token(),
        }
    }

    fn parts_with(method: Method, headers: &[(&str, &str)]) -> Parts {
        let mut builder = axum::http::Request::builder().method(method).uri("http://localhost/test");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, _body) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_session_cookie_extraction() {
        let config = test_config();
        let user = test_user();
        let token = create_session_token(&user, &config).unwrap();

        let cookie = format!("{}={token}", config.session.cookie_name);
        let parts = parts_with(Method::GET, &[("cookie", &cookie)]);

        let extracted = try_jwt_session_auth(&parts, &config).unwrap().unwrap();
        assert_eq!(extracted.id, user.id);
    }

    #[test]
    fn test_missing_cookie_yields_none() {
        let config = test_config();
        let parts = parts_with(Method::GET, &[]);
        assert!(try_jwt_session_auth(&parts, &config).is_none());
    }

    #[test]
    fn test_csrf_not_required_for_get() {
        let user = test_user();
        let parts = parts_with(Method::GET, &[]);
        assert!(check_csrf(&parts, &user).is_ok());
    }

    #[test]
    fn test_csrf_required_for_post() {
        let user = test_user();

        let parts = parts_with(Method::POST, &[]);
        assert!(check_csrf(&parts, &user).is_err());

        let csrf = user.csrf_token.clone();
        let parts = parts_with(Method::POST, &[("x-csrf-token", &csrf)]);
        assert!(check_csrf(&parts, &user).is_ok());

        let parts = parts_with(Method::POST, &[("x-csrf-token", "wrong-token")]);
        assert!(check_csrf(&parts, &user).is_err());
    }
}
