//! Database repository for site content blocks and link click tracking.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::content::{ContentCreateDBRequest, ContentDBResponse, ContentUpdateDBRequest},
};
use crate::types::{ContentId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing content blocks.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    /// Restrict to one kind ("link", "faq", "page")
    pub kind: Option<String>,
    /// Only include published blocks (the public listing)
    pub published_only: bool,
    pub skip: i64,
    pub limit: i64,
}

/// Aggregated click count for one link block.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LinkClickCount {
    pub content_id: ContentId,
    pub clicks: i64,
}

pub struct Content<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Content<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up a block by kind and slug.
    #[instrument(skip(self), err)]
    pub async fn get_by_kind_slug(&mut self, kind: &str, slug: &str) -> Result<Option<ContentDBResponse>> {
        let block = sqlx::query_as::<_, ContentDBResponse>(
            "SELECT * FROM site_content WHERE kind = $1 AND slug = $2",
        )
        .bind(kind)
        .bind(slug)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(block)
    }

    /// Record a click-through on a link block.
    #[instrument(skip(self), fields(content_id = %abbrev_uuid(&content_id)), err)]
    pub async fn record_click(
        &mut self,
        content_id: ContentId,
        client_ip: Option<&str>,
        referrer: Option<&str>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO link_clicks (id, content_id, client_ip, referrer) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(content_id)
            .bind(client_ip)
            .bind(referrer)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// Click totals per link, most clicked first.
    #[instrument(skip(self), err)]
    pub async fn click_counts(&mut self) -> Result<Vec<LinkClickCount>> {
        let counts = sqlx::query_as::<_, LinkClickCount>(
            r#"
            SELECT content_id, COUNT(*) AS clicks
            FROM link_clicks
            GROUP BY content_id
            ORDER BY clicks DESC
            "#,
        )
        .fetch_all(&mut *self.db)
        .await?;
        Ok(counts)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Content<'c> {
    type CreateRequest = ContentCreateDBRequest;
    type UpdateRequest = ContentUpdateDBRequest;
    type Response = ContentDBResponse;
    type Id = ContentId;
    type Filter = ContentFilter;

    #[instrument(skip(self, request), fields(kind = %request.kind, slug = %request.slug), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let block = sqlx::query_as::<_, ContentDBResponse>(
            r#"
            INSERT INTO site_content (id, kind, slug, title, body, url, position, published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.kind)
        .bind(&request.slug)
        .bind(&request.title)
        .bind(&request.body)
        .bind(&request.url)
        .bind(request.position)
        .bind(request.published)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(block)
    }

    #[instrument(skip(self), fields(content_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let block = sqlx::query_as::<_, ContentDBResponse>("SELECT * FROM site_content WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(block)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let blocks = sqlx::query_as::<_, ContentDBResponse>(
            r#"
            SELECT * FROM site_content
            WHERE ($1::TEXT IS NULL OR kind = $1)
              AND ($2 = FALSE OR published = TRUE)
            ORDER BY position ASC, created_at ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.kind)
        .bind(filter.published_only)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(blocks)
    }

    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM site_content
            WHERE ($1::TEXT IS NULL OR kind = $1)
              AND ($2 = FALSE OR published = TRUE)
            "#,
        )
        .bind(&filter.kind)
        .bind(filter.published_only)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(content_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let block = sqlx::query_as::<_, ContentDBResponse>(
            r#"
            UPDATE site_content SET
                slug = COALESCE($2, slug),
                title = COALESCE($3, title),
                body = COALESCE($4, body),
                url = COALESCE($5, url),
                position = COALESCE($6, position),
                published = COALESCE($7, published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.slug)
        .bind(&request.title)
        .bind(&request.body)
        .bind(&request.url)
        .bind(request.position)
        .bind(request.published)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(block)
    }

    #[instrument(skip(self), fields(content_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM site_content WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
