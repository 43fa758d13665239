//! Database repository for DJ sets.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::sets::{SetCreateDBRequest, SetDBResponse, SetUpdateDBRequest},
};
use crate::types::{CityId, SetId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing DJ sets.
#[derive(Debug, Clone, Default)]
pub struct SetFilter {
    /// Restrict to a single status (e.g. only published sets on the public site)
    pub status: Option<String>,
    /// Restrict to sets belonging to one city
    pub city_id: Option<CityId>,
    pub skip: i64,
    pub limit: i64,
}

pub struct Sets<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Sets<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up a set by its public slug.
    #[instrument(skip(self), err)]
    pub async fn get_by_slug(&mut self, slug: &str) -> Result<Option<SetDBResponse>> {
        let set = sqlx::query_as::<_, SetDBResponse>("SELECT * FROM dj_sets WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(set)
    }

    /// Atomically bump the play counter, returning the new count.
    #[instrument(skip(self), fields(set_id = %abbrev_uuid(&id)), err)]
    pub async fn increment_play_count(&mut self, id: SetId) -> Result<Option<i64>> {
        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE dj_sets SET play_count = play_count + 1 WHERE id = $1 RETURNING play_count",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Sets<'c> {
    type CreateRequest = SetCreateDBRequest;
    type UpdateRequest = SetUpdateDBRequest;
    type Response = SetDBResponse;
    type Id = SetId;
    type Filter = SetFilter;

    #[instrument(skip(self, request), fields(slug = %request.slug), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let set = sqlx::query_as::<_, SetDBResponse>(
            r#"
            INSERT INTO dj_sets
                (id, title, slug, city_id, youtube_video_id, spotify_url, description,
                 duration_seconds, status, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.title)
        .bind(&request.slug)
        .bind(request.city_id)
        .bind(&request.youtube_video_id)
        .bind(&request.spotify_url)
        .bind(&request.description)
        .bind(request.duration_seconds)
        .bind(&request.status)
        .bind(request.published_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(set)
    }

    #[instrument(skip(self), fields(set_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let set = sqlx::query_as::<_, SetDBResponse>("SELECT * FROM dj_sets WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(set)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sets = sqlx::query_as::<_, SetDBResponse>(
            r#"
            SELECT * FROM dj_sets
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR city_id = $2)
            ORDER BY published_at DESC NULLS LAST, created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.status)
        .bind(filter.city_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(sets)
    }

    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM dj_sets
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR city_id = $2)
            "#,
        )
        .bind(&filter.status)
        .bind(filter.city_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(set_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let set = sqlx::query_as::<_, SetDBResponse>(
            r#"
            UPDATE dj_sets SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                city_id = CASE WHEN $4 THEN $5 ELSE city_id END,
                youtube_video_id = COALESCE($6, youtube_video_id),
                spotify_url = COALESCE($7, spotify_url),
                description = COALESCE($8, description),
                duration_seconds = COALESCE($9, duration_seconds),
                status = COALESCE($10, status),
                published_at = CASE WHEN $11 THEN $12 ELSE published_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.slug)
        .bind(request.city_id.is_some())
        .bind(request.city_id.flatten())
        .bind(&request.youtube_video_id)
        .bind(&request.spotify_url)
        .bind(&request.description)
        .bind(request.duration_seconds)
        .bind(&request.status)
        .bind(request.published_at.is_some())
        .bind(request.published_at.flatten())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(set)
    }

    #[instrument(skip(self), fields(set_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM dj_sets WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
