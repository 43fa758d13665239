//! Database repository for contact form submissions.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::contact::{ContactCreateDBRequest, ContactDBResponse, ContactUpdateDBRequest},
};
use crate::types::{ContactMessageId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing contact messages.
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    /// Only include messages not yet marked handled
    pub unhandled_only: bool,
    pub skip: i64,
    pub limit: i64,
}

pub struct ContactMessages<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ContactMessages<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for ContactMessages<'c> {
    type CreateRequest = ContactCreateDBRequest;
    type UpdateRequest = ContactUpdateDBRequest;
    type Response = ContactDBResponse;
    type Id = ContactMessageId;
    type Filter = ContactFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let message = sqlx::query_as::<_, ContactDBResponse>(
            r#"
            INSERT INTO contact_messages (id, name, email, subject, body, client_ip)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.subject)
        .bind(&request.body)
        .bind(&request.client_ip)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(message)
    }

    #[instrument(skip(self), fields(message_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let message =
            sqlx::query_as::<_, ContactDBResponse>("SELECT * FROM contact_messages WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?;
        Ok(message)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let messages = sqlx::query_as::<_, ContactDBResponse>(
            r#"
            SELECT * FROM contact_messages
            WHERE ($1 = FALSE OR handled = FALSE)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.unhandled_only)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(messages)
    }

    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contact_messages WHERE ($1 = FALSE OR handled = FALSE)",
        )
        .bind(filter.unhandled_only)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(message_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let message = sqlx::query_as::<_, ContactDBResponse>(
            "UPDATE contact_messages SET handled = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(request.handled)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(message)
    }

    #[instrument(skip(self), fields(message_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
