//! API models for DJ sets.

use crate::db::models::sets::{SetCreateDBRequest, SetDBResponse, SetUpdateDBRequest};
use crate::errors::Error;
use crate::types::{CityId, SetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Publication state of a DJ set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SetStatus {
    Draft,
    Published,
    Archived,
}

impl SetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetStatus::Draft => "draft",
            SetStatus::Published => "published",
            SetStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for SetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SetStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SetStatus::Draft),
            "published" => Ok(SetStatus::Published),
            "archived" => Ok(SetStatus::Archived),
            other => Err(Error::BadRequest {
                message: format!("Unknown set status: {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetCreate {
    pub title: String,
    pub slug: String,
    pub city_id: Option<CityId>,
    pub youtube_video_id: Option<String>,
    pub spotify_url: Option<String>,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
    #[serde(default = "default_status")]
    pub status: SetStatus,
}

fn default_status() -> SetStatus {
    SetStatus::Draft
}

/// Maps a present-but-null JSON field to `Some(None)` so PATCH bodies can
/// distinguish "clear this" from "leave it alone".
fn deserialize_explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SetUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    /// Double option: absent leaves the city unchanged, explicit null clears it
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    #[schema(value_type = Option<CityId>)]
    pub city_id: Option<Option<CityId>>,
    pub youtube_video_id: Option<String>,
    pub spotify_url: Option<String>,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
    pub status: Option<SetStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetResponse {
    pub id: SetId,
    pub title: String,
    pub slug: String,
    pub city_id: Option<CityId>,
    pub youtube_video_id: Option<String>,
    pub spotify_url: Option<String>,
    pub description: Option<String>,
    pub duration_seconds: Option<i32>,
    pub status: SetStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub play_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SetDBResponse> for SetResponse {
    type Error = Error;

    fn try_from(set: SetDBResponse) -> Result<Self, Error> {
        Ok(Self {
            id: set.id,
            title: set.title,
            slug: set.slug,
            city_id: set.city_id,
            youtube_video_id: set.youtube_video_id,
            spotify_url: set.spotify_url,
            description: set.description,
            duration_seconds: set.duration_seconds,
            status: set.status.parse()?,
            published_at: set.published_at,
            play_count: set.play_count,
            created_at: set.created_at,
            updated_at: set.updated_at,
        })
    }
}

impl From<SetCreate> for SetCreateDBRequest {
    fn from(api: SetCreate) -> Self {
        let published_at = match api.status {
            SetStatus::Published => Some(Utc::now()),
            _ => None,
        };
        Self {
            title: api.title,
            slug: api.slug,
            city_id: api.city_id,
            youtube_video_id: api.youtube_video_id,
            spotify_url: api.spotify_url,
            description: api.description,
            duration_seconds: api.duration_seconds,
            status: api.status.as_str().to_string(),
            published_at,
        }
    }
}

impl From<SetUpdate> for SetUpdateDBRequest {
    fn from(api: SetUpdate) -> Self {
        // Moving into published stamps the publication time
        let published_at = match api.status {
            Some(SetStatus::Published) => Some(Some(Utc::now())),
            _ => None,
        };
        Self {
            title: api.title,
            slug: api.slug,
            city_id: api.city_id,
            youtube_video_id: api.youtube_video_id,
            spotify_url: api.spotify_url,
            description: api.description,
            duration_seconds: api.duration_seconds,
            status: api.status.map(|s| s.as_str().to_string()),
            published_at,
        }
    }
}

/// One row of a bulk import request.
pub type SetImportRow = SetCreate;

/// Per-row outcome of a bulk import.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetImportRowResult {
    pub slug: String,
    pub success: bool,
    pub id: Option<SetId>,
    pub error: Option<String>,
}

/// Summary of a bulk import. Import continues past failing rows.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetImportResult {
    pub imported: usize,
    pub failed: usize,
    pub rows: Vec<SetImportRowResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [SetStatus::Draft, SetStatus::Published, SetStatus::Archived] {
            assert_eq!(status.as_str().parse::<SetStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<SetStatus>().is_err());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let update: SetUpdate = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        assert!(update.city_id.is_none());

        let update: SetUpdate = serde_json::from_str(r#"{"city_id":null}"#).unwrap();
        assert_eq!(update.city_id, Some(None));

        let id = uuid::Uuid::new_v4();
        let update: SetUpdate = serde_json::from_str(&format!(r#"{{"city_id":"{id}"}}"#)).unwrap();
        assert_eq!(update.city_id, Some(Some(id)));
    }

    #[test]
    fn test_publishing_stamps_published_at() {
        let create = SetCreate {
            title: "T".to_string(),
            slug: "t".to_string(),
            city_id: None,
            youtube_video_id: None,
            spotify_url: None,
            description: None,
            duration_seconds: None,
            status: SetStatus::Published,
        };
        let db: SetCreateDBRequest = create.into();
        assert!(db.published_at.is_some());

        let draft = SetCreate {
            title: "T".to_string(),
            slug: "t".to_string(),
            city_id: None,
            youtube_video_id: None,
            spotify_url: None,
            description: None,
            duration_seconds: None,
            status: SetStatus::Draft,
        };
        let db: SetCreateDBRequest = draft.into();
        assert!(db.published_at.is_none());
    }
}
