//! Database models for contact form submissions.

use crate::types::ContactMessageId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ContactCreateDBRequest {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub body: String,
    pub client_ip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ContactUpdateDBRequest {
    pub handled: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContactDBResponse {
    pub id: ContactMessageId,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub body: String,
    pub client_ip: Option<String>,
    pub handled: bool,
    pub created_at: DateTime<Utc>,
}
