//! Database repository for social posts, platform variants, and scheduled jobs.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::social::{
        JobCreateDBRequest, JobDBResponse, PostCreateDBRequest, PostDBResponse, PostUpdateDBRequest,
        VariantDBResponse, VariantUpsertDBRequest,
    },
};
use crate::types::{JobId, PostId, VariantId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing social posts.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

/// Filter for listing scheduled jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub post_id: Option<PostId>,
    pub status: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

pub struct SocialPosts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> SocialPosts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert or overwrite the variant for one platform of a post.
    #[instrument(skip(self, request), fields(post_id = %abbrev_uuid(&request.post_id), platform = %request.platform), err)]
    pub async fn upsert_variant(&mut self, request: &VariantUpsertDBRequest) -> Result<VariantDBResponse> {
        let variant = sqlx::query_as::<_, VariantDBResponse>(
            r#"
            INSERT INTO social_post_variants (id, post_id, platform, body, hashtags, media_aspect_ratio, media_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ON CONSTRAINT social_post_variants_post_platform_unique
            DO UPDATE SET
                body = EXCLUDED.body,
                hashtags = EXCLUDED.hashtags,
                media_aspect_ratio = EXCLUDED.media_aspect_ratio,
                media_count = EXCLUDED.media_count
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.post_id)
        .bind(&request.platform)
        .bind(&request.body)
        .bind(&request.hashtags)
        .bind(&request.media_aspect_ratio)
        .bind(request.media_count)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(variant)
    }

    /// All variants for a post.
    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&post_id)), err)]
    pub async fn list_variants(&mut self, post_id: PostId) -> Result<Vec<VariantDBResponse>> {
        let variants = sqlx::query_as::<_, VariantDBResponse>(
            "SELECT * FROM social_post_variants WHERE post_id = $1 ORDER BY platform ASC",
        )
        .bind(post_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(variants)
    }

    /// Remove one platform variant. Returns false when nothing matched.
    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&post_id)), err)]
    pub async fn delete_variant(&mut self, post_id: PostId, variant_id: VariantId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM social_post_variants WHERE id = $2 AND post_id = $1")
            .bind(post_id)
            .bind(variant_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Queue one scheduled publish job.
    #[instrument(skip(self, request), fields(post_id = %abbrev_uuid(&request.post_id), platform = %request.platform), err)]
    pub async fn create_job(&mut self, request: &JobCreateDBRequest) -> Result<JobDBResponse> {
        let job = sqlx::query_as::<_, JobDBResponse>(
            r#"
            INSERT INTO social_jobs (id, post_id, platform, scheduled_at, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.post_id)
        .bind(&request.platform)
        .bind(request.scheduled_at)
        .bind(&request.status)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(job)
    }

    /// Jobs across all posts, soonest first.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list_jobs(&mut self, filter: &JobFilter) -> Result<Vec<JobDBResponse>> {
        let jobs = sqlx::query_as::<_, JobDBResponse>(
            r#"
            SELECT * FROM social_jobs
            WHERE ($1::UUID IS NULL OR post_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY scheduled_at ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.post_id)
        .bind(&filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(jobs)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count_jobs(&mut self, filter: &JobFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM social_jobs
            WHERE ($1::UUID IS NULL OR post_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            "#,
        )
        .bind(filter.post_id)
        .bind(&filter.status)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    /// Cancel a queued job. Only jobs still in the queued state can be cancelled.
    #[instrument(skip(self), fields(job_id = %abbrev_uuid(&job_id)), err)]
    pub async fn cancel_job(&mut self, job_id: JobId) -> Result<Option<JobDBResponse>> {
        let job = sqlx::query_as::<_, JobDBResponse>(
            r#"
            UPDATE social_jobs SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1 AND status = 'queued'
            RETURNING *
            "#,
        )
        .bind(job_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(job)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for SocialPosts<'c> {
    type CreateRequest = PostCreateDBRequest;
    type UpdateRequest = PostUpdateDBRequest;
    type Response = PostDBResponse;
    type Id = PostId;
    type Filter = PostFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let post = sqlx::query_as::<_, PostDBResponse>(
            r#"
            INSERT INTO social_posts (id, plan_id, title, body, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.plan_id)
        .bind(&request.title)
        .bind(&request.body)
        .bind(&request.status)
        .bind(request.created_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(post)
    }

    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let post = sqlx::query_as::<_, PostDBResponse>("SELECT * FROM social_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(post)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let posts = sqlx::query_as::<_, PostDBResponse>(
            r#"
            SELECT * FROM social_posts
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(posts)
    }

    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM social_posts WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(&filter.status)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(post_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let post = sqlx::query_as::<_, PostDBResponse>(
            r#"
            UPDATE social_posts SET
                title = COALESCE($2, title),
                body = COALESCE($3, body),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.body)
        .bind(&request.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(post)
    }

    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM social_posts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
