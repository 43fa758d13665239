//! API models for virtual club characters.

use crate::db::models::club::{CharacterCreateDBRequest, CharacterDBResponse, CharacterUpdateDBRequest};
use crate::errors::Error;
use crate::types::CharacterId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CharacterCreate {
    pub name: String,
    pub sprite: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#ffffff".to_string()
}

impl CharacterCreate {
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Character name is required".to_string(),
            });
        }
        if self.sprite.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Character sprite is required".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CharacterUpdate {
    pub name: Option<String>,
    pub sprite: Option<String>,
    pub color: Option<String>,
}

impl From<CharacterCreate> for CharacterCreateDBRequest {
    fn from(api: CharacterCreate) -> Self {
        Self {
            name: api.name.trim().to_string(),
            sprite: api.sprite,
            color: api.color,
        }
    }
}

impl From<CharacterUpdate> for CharacterUpdateDBRequest {
    fn from(api: CharacterUpdate) -> Self {
        Self {
            name: api.name,
            sprite: api.sprite,
            color: api.color,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CharacterResponse {
    pub id: CharacterId,
    pub name: String,
    pub sprite: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl From<CharacterDBResponse> for CharacterResponse {
    fn from(character: CharacterDBResponse) -> Self {
        Self {
            id: character.id,
            name: character.name,
            sprite: character.sprite,
            color: character.color,
            created_at: character.created_at,
        }
    }
}
