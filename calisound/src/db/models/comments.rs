//! Database models for set comments.

use crate::types::{CommentId, SetId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct CommentCreateDBRequest {
    pub set_id: SetId,
    pub author_name: String,
    pub author_email: Option<String>,
    pub body: String,
    pub status: String,
    pub client_ip: Option<String>,
}

/// Moderation only changes status; the body is never edited.
#[derive(Debug, Clone)]
pub struct CommentUpdateDBRequest {
    pub status: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentDBResponse {
    pub id: CommentId,
    pub set_id: SetId,
    pub author_name: String,
    pub author_email: Option<String>,
    pub body: String,
    pub status: String,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
