//! Database models for DJ sets.

use crate::types::{CityId, SetId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct SetCreateDBRequest {
    pub title: String,
    pub slug: String,
    pub city_id: Option<CityId>,
    pub youtube_video_id: Option<String>,
    pub spotify_url: Option<String>,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// `None` fields are left untouched. `city_id` and `published_at` use nested
/// options so callers can clear them.
#[derive(Debug, Clone, Default)]
pub struct SetUpdateDBRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub city_id: Option<Option<CityId>>,
    pub youtube_video_id: Option<String>,
    pub spotify_url: Option<String>,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
    pub status: Option<String>,
    pub published_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SetDBResponse {
    pub id: SetId,
    pub title: String,
    pub slug: String,
    pub city_id: Option<CityId>,
    pub youtube_video_id: Option<String>,
    pub spotify_url: Option<String>,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub play_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
