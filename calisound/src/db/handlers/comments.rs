//! Database repository for set comments.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::comments::{CommentCreateDBRequest, CommentDBResponse, CommentUpdateDBRequest},
};
use crate::types::{CommentId, SetId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing comments.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub set_id: Option<SetId>,
    /// Restrict to one moderation status ("pending", "approved", "rejected")
    pub status: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

pub struct Comments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Comments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Comments<'c> {
    type CreateRequest = CommentCreateDBRequest;
    type UpdateRequest = CommentUpdateDBRequest;
    type Response = CommentDBResponse;
    type Id = CommentId;
    type Filter = CommentFilter;

    #[instrument(skip(self, request), fields(set_id = %abbrev_uuid(&request.set_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let comment = sqlx::query_as::<_, CommentDBResponse>(
            r#"
            INSERT INTO comments (id, set_id, author_name, author_email, body, status, client_ip)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.set_id)
        .bind(&request.author_name)
        .bind(&request.author_email)
        .bind(&request.body)
        .bind(&request.status)
        .bind(&request.client_ip)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(comment)
    }

    #[instrument(skip(self), fields(comment_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let comment = sqlx::query_as::<_, CommentDBResponse>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(comment)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let comments = sqlx::query_as::<_, CommentDBResponse>(
            r#"
            SELECT * FROM comments
            WHERE ($1::UUID IS NULL OR set_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.set_id)
        .bind(&filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(comments)
    }

    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM comments
            WHERE ($1::UUID IS NULL OR set_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            "#,
        )
        .bind(filter.set_id)
        .bind(&filter.status)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(comment_id = %abbrev_uuid(&id), status = %request.status), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let comment = sqlx::query_as::<_, CommentDBResponse>(
            "UPDATE comments SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&request.status)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(comment)
    }

    #[instrument(skip(self), fields(comment_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
