//! Database models for virtual club characters.

use crate::types::CharacterId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct CharacterCreateDBRequest {
    pub name: String,
    pub sprite: String,
    pub color: String,
}

/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct CharacterUpdateDBRequest {
    pub name: Option<String>,
    pub sprite: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CharacterDBResponse {
    pub id: CharacterId,
    pub name: String,
    pub sprite: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}
