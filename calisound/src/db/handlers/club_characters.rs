//! Database repository for virtual club characters.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::club::{CharacterCreateDBRequest, CharacterDBResponse, CharacterUpdateDBRequest},
};
use crate::types::{CharacterId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing characters.
#[derive(Debug, Clone)]
pub struct CharacterFilter {
    pub skip: i64,
    pub limit: i64,
}

pub struct ClubCharacters<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ClubCharacters<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for ClubCharacters<'c> {
    type CreateRequest = CharacterCreateDBRequest;
    type UpdateRequest = CharacterUpdateDBRequest;
    type Response = CharacterDBResponse;
    type Id = CharacterId;
    type Filter = CharacterFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let character = sqlx::query_as::<_, CharacterDBResponse>(
            "INSERT INTO club_characters (id, name, sprite, color) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.sprite)
        .bind(&request.color)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(character)
    }

    #[instrument(skip(self), fields(character_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let character =
            sqlx::query_as::<_, CharacterDBResponse>("SELECT * FROM club_characters WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?;
        Ok(character)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let characters = sqlx::query_as::<_, CharacterDBResponse>(
            "SELECT * FROM club_characters ORDER BY name ASC LIMIT $1 OFFSET $2",
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(characters)
    }

    async fn count(&mut self, _filter: &Self::Filter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM club_characters")
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(character_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let character = sqlx::query_as::<_, CharacterDBResponse>(
            r#"
            UPDATE club_characters SET
                name = COALESCE($2, name),
                sprite = COALESCE($3, sprite),
                color = COALESCE($4, color)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.sprite)
        .bind(&request.color)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(character)
    }

    #[instrument(skip(self), fields(character_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM club_characters WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
