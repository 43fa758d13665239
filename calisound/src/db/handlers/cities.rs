//! Database repository for cities.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::cities::{CityCreateDBRequest, CityDBResponse, CityUpdateDBRequest},
};
use crate::types::{CityId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing cities.
#[derive(Debug, Clone)]
pub struct CityFilter {
    /// Only include cities marked active (the public listing)
    pub active_only: bool,
    pub skip: i64,
    pub limit: i64,
}

impl CityFilter {
    pub fn new(active_only: bool, skip: i64, limit: i64) -> Self {
        Self { active_only, skip, limit }
    }
}

pub struct Cities<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Cities<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up a city by its public slug.
    #[instrument(skip(self), err)]
    pub async fn get_by_slug(&mut self, slug: &str) -> Result<Option<CityDBResponse>> {
        let city = sqlx::query_as::<_, CityDBResponse>("SELECT * FROM cities WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(city)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Cities<'c> {
    type CreateRequest = CityCreateDBRequest;
    type UpdateRequest = CityUpdateDBRequest;
    type Response = CityDBResponse;
    type Id = CityId;
    type Filter = CityFilter;

    #[instrument(skip(self, request), fields(slug = %request.slug), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let city = sqlx::query_as::<_, CityDBResponse>(
            r#"
            INSERT INTO cities (id, name, slug, region, description, hero_image_url, playlist_url, active, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.slug)
        .bind(&request.region)
        .bind(&request.description)
        .bind(&request.hero_image_url)
        .bind(&request.playlist_url)
        .bind(request.active)
        .bind(request.position)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(city)
    }

    #[instrument(skip(self), fields(city_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let city = sqlx::query_as::<_, CityDBResponse>("SELECT * FROM cities WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(city)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let cities = sqlx::query_as::<_, CityDBResponse>(
            r#"
            SELECT * FROM cities
            WHERE ($1 = FALSE OR active = TRUE)
            ORDER BY position ASC, name ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.active_only)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(cities)
    }

    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cities WHERE ($1 = FALSE OR active = TRUE)")
                .bind(filter.active_only)
                .fetch_one(&mut *self.db)
                .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(city_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let city = sqlx::query_as::<_, CityDBResponse>(
            r#"
            UPDATE cities SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                region = COALESCE($4, region),
                description = COALESCE($5, description),
                hero_image_url = COALESCE($6, hero_image_url),
                playlist_url = COALESCE($7, playlist_url),
                active = COALESCE($8, active),
                position = COALESCE($9, position),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.slug)
        .bind(&request.region)
        .bind(&request.description)
        .bind(&request.hero_image_url)
        .bind(&request.playlist_url)
        .bind(request.active)
        .bind(request.position)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(city)
    }

    #[instrument(skip(self), fields(city_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cities WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
