//! Database access for the admin activity log.
//!
//! The log is append-only, so this does not implement the full `Repository`
//! trait. Entries are recorded on the same connection (and therefore in the
//! same transaction) as the admin mutation they describe.

use crate::db::{
    errors::Result,
    models::activity::{ActivityCreateDBRequest, ActivityDBResponse},
};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing activity log entries.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Restrict to one entity type ("city", "set", "comment", ...)
    pub entity_type: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

pub struct ActivityLogs<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ActivityLogs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(action = %request.action, entity_type = %request.entity_type), err)]
    pub async fn record(&mut self, request: &ActivityCreateDBRequest) -> Result<ActivityDBResponse> {
        let entry = sqlx::query_as::<_, ActivityDBResponse>(
            r#"
            INSERT INTO activity_logs (id, actor_id, action, entity_type, entity_id, detail)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.actor_id)
        .bind(&request.action)
        .bind(&request.entity_type)
        .bind(&request.entity_id)
        .bind(&request.detail)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(entry)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &ActivityFilter) -> Result<Vec<ActivityDBResponse>> {
        let entries = sqlx::query_as::<_, ActivityDBResponse>(
            r#"
            SELECT * FROM activity_logs
            WHERE ($1::TEXT IS NULL OR entity_type = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&filter.entity_type)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(entries)
    }

    pub async fn count(&mut self, filter: &ActivityFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM activity_logs WHERE ($1::TEXT IS NULL OR entity_type = $1)",
        )
        .bind(&filter.entity_type)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }
}
