//! Database models for social posts, platform variants, and scheduled jobs.

use crate::types::{JobId, PlanId, PostId, UserId, VariantId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct PostCreateDBRequest {
    pub plan_id: Option<PlanId>,
    pub title: String,
    pub body: String,
    pub status: String,
    pub created_by: Option<UserId>,
}

/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PostUpdateDBRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PostDBResponse {
    pub id: PostId,
    pub plan_id: Option<PlanId>,
    pub title: String,
    pub body: String,
    pub status: String,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert request for one platform variant of a post.
#[derive(Debug, Clone)]
pub struct VariantUpsertDBRequest {
    pub post_id: PostId,
    pub platform: String,
    pub body: String,
    pub hashtags: Vec<String>,
    pub media_aspect_ratio: Option<String>,
    pub media_count: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct VariantDBResponse {
    pub id: VariantId,
    pub post_id: PostId,
    pub platform: String,
    pub body: String,
    pub hashtags: Vec<String>,
    pub media_aspect_ratio: Option<String>,
    pub media_count: i32,
}

#[derive(Debug, Clone)]
pub struct JobCreateDBRequest {
    pub post_id: PostId,
    pub platform: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct JobDBResponse {
    pub id: JobId,
    pub post_id: PostId,
    pub platform: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
