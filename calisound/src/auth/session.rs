//! JWT session token creation and verification.
//!
//! Two token kinds share one claims shape: full session tokens set in the
//! session cookie, and short-lived pending tokens handed out between the
//! password step and the TOTP step of login. A pending token never
//! authenticates a request.

use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{
    api::models::auth::CurrentUser,
    config::Config,
    errors::Error,
    types::UserId,
};

/// Which login stage a token represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Session,
    PendingTotp,
}

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,      // Subject (user ID)
    pub email: String,    // User email
    pub username: String, // Username
    pub is_admin: bool,   // Admin flag
    pub csrf: String,     // CSRF token bound to this session
    pub kind: TokenKind,  // Full session or pending TOTP step
    pub exp: i64,         // Expiration time
    pub iat: i64,         // Issued at
}

impl From<SessionClaims> for CurrentUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            username: claims.username,
            is_admin: claims.is_admin,
            csrf_token: claims.csrf,
        }
    }
}

/// Generate a random CSRF token, base64url without padding.
pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn secret_key(config: &Config) -> Result<&str, Error> {
    config.secret_key.as_deref().ok_or_else(|| Error::Internal {
        operation: "JWT sessions: secret_key is required".to_string(),
    })
}

fn sign(claims: &SessionClaims, config: &Config) -> Result<String, Error> {
    let key = EncodingKey::from_secret(secret_key(config)?.as_bytes());
    encode(&Header::default(), claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

/// Create a full session token for a user.
pub fn create_session_token(user: &CurrentUser, config: &Config) -> Result<String, Error> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        is_admin: user.is_admin,
        csrf: user.csrf_token.clone(),
        kind: TokenKind::Session,
        exp: (now + config.session.expiry).timestamp(),
        iat: now.timestamp(),
    };
    sign(&claims, config)
}

/// Create the short-lived token handed out after a correct password when the
/// account still has to pass the TOTP step.
pub fn create_pending_token(user: &CurrentUser, config: &Config) -> Result<String, Error> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        is_admin: user.is_admin,
        csrf: String::new(),
        kind: TokenKind::PendingTotp,
        exp: (now + config.session.pending_expiry).timestamp(),
        iat: now.timestamp(),
    };
    sign(&claims, config)
}

fn decode_claims(token: &str, config: &Config) -> Result<SessionClaims, Error> {
    let key = DecodingKey::from_secret(secret_key(config)?.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },

        // Server errors (500) - key issues, internal failures
        _ => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },
    })?;

    Ok(token_data.claims)
}

/// Verify and decode a full session token.
pub fn verify_session_token(token: &str, config: &Config) -> Result<CurrentUser, Error> {
    let claims = decode_claims(token, config)?;
    if claims.kind != TokenKind::Session {
        return Err(Error::Unauthenticated { message: None });
    }
    Ok(CurrentUser::from(claims))
}

/// Verify a pending token from the password step, returning the user it names.
pub fn verify_pending_token(token: &str, config: &Config) -> Result<CurrentUser, Error> {
    let claims = decode_claims(token, config)?;
    if claims.kind != TokenKind::PendingTotp {
        return Err(Error::Unauthenticated {
            message: Some("Expected a pending login token".to_string()),
        });
    }
    Ok(CurrentUser::from(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn create_test_config() -> Config {
        Config {
            secret_key: Some("test-secret-key-for-jwt".to_string()),
            ..Default::default()
        }
    }

    fn create_test_user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            username: "admin".to_string(),
            is_admin: true,
            csrf_token: generate_csrf_token(),
        }
    }

    #[test]
    fn test_create_and_verify_session_token() {
        let config = create_test_config();
        let user = create_test_user();

        let token = create_session_token(&user, &config).unwrap();
        assert!(!token.is_empty());

        let verified = verify_session_token(&token, &config).unwrap();
        assert_eq!(verified.id, user.id);
        assert_eq!(verified.email, user.email);
        assert_eq!(verified.csrf_token, user.csrf_token);
        assert!(verified.is_admin);
    }

    #[test]
    fn test_pending_token_is_not_a_session() {
        let config = create_test_config();
        let user = create_test_user();

        let pending = create_pending_token(&user, &config).unwrap();

        // Pending tokens must not authenticate requests
        let result = verify_session_token(&pending, &config);
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));

        // But they do pass pending verification
        let verified = verify_pending_token(&pending, &config).unwrap();
        assert_eq!(verified.id, user.id);
    }

    #[test]
    fn test_session_token_is_not_pending() {
        let config = create_test_config();
        let user = create_test_user();

        let token = create_session_token(&user, &config).unwrap();
        let result = verify_pending_token(&token, &config);
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_verify_token_wrong_secret() {
        let mut config = create_test_config();
        let user = create_test_user();

        let token = create_session_token(&user, &config).unwrap();

        config.secret_key = Some("different-secret".to_string());
        let result = verify_session_token(&token, &config);
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_verify_expired_token() {
        let config = create_test_config();
        let user = create_test_user();

        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            is_admin: user.is_admin,
            csrf: user.csrf_token.clone(),
            kind: TokenKind::Session,
            exp: (now - chrono::Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        };

        let key = EncodingKey::from_secret(config.secret_key.as_ref().unwrap().as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let result = verify_session_token(&token, &config);
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_verify_malformed_token() {
        let config = create_test_config();

        for token in ["not.a.token", "invalid", "", "too.many.parts.in.this.token"] {
            let result = verify_session_token(token, &config);
            assert!(
                matches!(result.unwrap_err(), Error::Unauthenticated { .. }),
                "Expected Unauthenticated error for token: {token}"
            );
        }
    }

    #[test]
    fn test_csrf_tokens_are_unique() {
        let t1 = generate_csrf_token();
        let t2 = generate_csrf_token();
        assert_ne!(t1, t2);
        assert_eq!(t1.len(), 43); // 32 bytes base64url, no padding
    }
}
