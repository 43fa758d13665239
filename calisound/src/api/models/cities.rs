//! API models for cities.

use crate::db::models::cities::{CityCreateDBRequest, CityDBResponse, CityUpdateDBRequest};
use crate::types::CityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CityCreate {
    pub name: String,
    pub slug: String,
    pub region: Option<String>,
    pub description: Option<String>,
    pub hero_image_url: Option<String>,
    pub playlist_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub position: i32,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CityUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub hero_image_url: Option<String>,
    pub playlist_url: Option<String>,
    pub active: Option<bool>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CityResponse {
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

impl From<CityDBResponse> for CityResponse {
    fn from(city: CityDBResponse) -> Self {
        Self {
            id: city.id,
            name: city.name,
            slug: city.slug,
            region: city.region,
            description: city.description,
            hero_image_url: city.hero_image_url,
            playlist_url: city.playlist_url,
            active: city.active,
            position: city.position,
            created_at: city.created_at,
            updated_at: city.updated_at,
        }
    }
}

impl From<CityCreate> for CityCreateDBRequest {
    fn from(api: CityCreate) -> Self {
        Self {
            name: api.name,
            slug: api.slug,
            region: api.region,
            description: api.description,
            hero_image_url: api.hero_image_url,
            playlist_url: api.playlist_url,
            active: api.active,
            position: api.position,
        }
    }
}

impl From<CityUpdate> for CityUpdateDBRequest {
    fn from(api: CityUpdate) -> Self {
        Self {
            name: api.name,
            slug: api.slug,
            region: api.region,
            description: api.description,
            hero_image_url: api.hero_image_url,
            playlist_url: api.playlist_url,
            active: api.active,
            position: api.position,
        }
    }
}
