//! Database models for site content blocks (links, FAQ entries, page copy).

use crate::types::ContentId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ContentCreateDBRequest {
    pub kind: String,
    pub slug: String,
    pub title: String,
    pub body: Option<String>,
    pub url: Option<String>,
    pub position: i32,
    pub published: bool,
}

/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ContentUpdateDBRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
    pub position: Option<i32>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContentDBResponse {
    pub id: ContentId,
    pub kind: String,
    pub slug: String,
    pub title: String,
    pub body: Option<String>,
    pub url: Option<String>,
    pub position: i32,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
