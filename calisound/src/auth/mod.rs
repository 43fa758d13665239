//! Authentication: password hashing, JWT sessions, TOTP, and request extraction.

pub mod current_user;
pub mod password;
pub mod session;
pub mod totp;

use crate::api::models::auth::CurrentUser;
use crate::errors::{Error, Result};

/// Reject non-admin users. Every back-office handler runs through this.
pub fn require_admin(user: &CurrentUser) -> Result<()> {
    if user.is_admin {
        Ok(())
    } else {
        Err(Error::Forbidden {
            message: "Admin access required".to_string(),
        })
    }
}
