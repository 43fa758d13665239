//! API models for set comments and moderation.

use crate::db::models::comments::{CommentCreateDBRequest, CommentDBResponse};
use crate::errors::Error;
use crate::types::{CommentId, SetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Moderation state of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
    Spam,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
            CommentStatus::Spam => "spam",
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CommentStatus::Pending),
            "approved" => Ok(CommentStatus::Approved),
            "rejected" => Ok(CommentStatus::Rejected),
            "spam" => Ok(CommentStatus::Spam),
            other => Err(Error::BadRequest {
                message: format!("Unknown comment status: {other}"),
            }),
        }
    }
}

/// Public comment submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentSubmit {
    pub author_name: String,
    pub author_email: Option<String>,
    pub body: String,
}

impl CommentSubmit {
    /// Basic field validation; moderation happens later.
    pub fn validate(&self) -> Result<(), Error> {
        if self.author_name.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Author name is required".to_string(),
            });
        }
        if self.author_name.chars().count() > 80 {
            return Err(Error::BadRequest {
                message: "Author name exceeds 80 characters".to_string(),
            });
        }
        if let Some(email) = &self.author_email {
            if !email.contains('@') || email.trim().len() < 3 {
                return Err(Error::BadRequest {
                    message: "Author email is not a valid address".to_string(),
                });
            }
        }
        if self.body.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Comment body is required".to_string(),
            });
        }
        if self.body.chars().count() > 2000 {
            return Err(Error::BadRequest {
                message: "Comment body exceeds 2000 characters".to_string(),
            });
        }
        Ok(())
    }

    pub fn into_db_request(self, set_id: SetId, client_ip: String) -> CommentCreateDBRequest {
        CommentCreateDBRequest {
            set_id,
            author_name: self.author_name.trim().to_string(),
            author_email: self.author_email,
            body: self.body.trim().to_string(),
            status: CommentStatus::Pending.as_str().to_string(),
            client_ip: Some(client_ip),
        }
    }
}

/// Public view of an approved comment. Email and client IP stay private.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: CommentId,
    pub set_id: SetId,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentDBResponse> for CommentResponse {
    fn from(comment: CommentDBResponse) -> Self {
        Self {
            id: comment.id,
            set_id: comment.set_id,
            author_name: comment.author_name,
            body: comment.body,
            created_at: comment.created_at,
        }
    }
}

/// Moderation view, including the fields hidden from the public.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminCommentResponse {
    pub id: CommentId,
    pub set_id: SetId,
    pub author_name: String,
    pub author_email: Option<String>,
    pub body: String,
    pub status: CommentStatus,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CommentDBResponse> for AdminCommentResponse {
    type Error = Error;

    fn try_from(comment: CommentDBResponse) -> Result<Self, Error> {
        Ok(Self {
            id: comment.id,
            set_id: comment.set_id,
            author_name: comment.author_name,
            author_email: comment.author_email,
            body: comment.body,
            status: comment.status.parse()?,
            client_ip: comment.client_ip,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
    }
}

/// Moderation status change.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentStatusUpdate {
    pub status: CommentStatus,
}
