//! API models for authentication and the admin user profile.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authenticated admin attached to a request.
///
/// Reconstructed from session token claims, so it carries no database columns
/// beyond what login put into the token. The CSRF token rides along so `/me`
/// can hand it to the browser for mutating requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    #[serde(skip)]
    pub csrf_token: String,
}

/// Login request with email and password.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Second login step: the code from the authenticator app plus the pending
/// token issued by the password step.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TotpVerifyRequest {
    pub pending_token: String,
    pub code: String,
}

/// Returned by the password step when the account has TOTP enabled.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TotpChallengeResponse {
    pub totp_required: bool,
    pub pending_token: String,
}

/// Session info returned after a completed login and from `/me`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub csrf_token: String,
}

/// Public-safe view of an admin user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub totp_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(user: UserDBResponse) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            is_admin: user.is_admin,
            totp_enabled: user.totp_enabled,
            created_at: user.created_at,
        }
    }
}

/// Returned from TOTP setup: the secret to store in an authenticator app.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TotpSetupResponse {
    pub secret: String,
    pub otpauth_url: String,
}

/// Request to confirm TOTP enrolment with a first valid code.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TotpEnableRequest {
    pub code: String,
}

/// Password change for the logged-in admin.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Simple message body for auth endpoints with nothing else to say.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthMessageResponse {
    pub message: String,
}
