//! Database models for cities.

use crate::types::CityId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct CityCreateDBRequest {
    pub name: String,
    pub slug: String,
    pub region: Option<String>,
    pub description: Option<String>,
    pub hero_image_url: Option<String>,
    pub playlist_url: Option<String>,
    pub active: bool,
    pub position: i32,
}

/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct CityUpdateDBRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub hero_image_url: Option<String>,
    pub playlist_url: Option<String>,
    pub active: Option<bool>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CityDBResponse {
    pub id: CityId,
    pub name: String,
    pub slug: String,
    pub region: Option<String>,
    pub description: Option<String>,
    pub hero_image_url: Option<String>,
    pub playlist_url: Option<String>,
    pub active: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
