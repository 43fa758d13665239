//! Database repository for release plans, timeline tasks, and generated copy.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::releases::{
        CopyDBResponse, CopyUpsertDBRequest, PlanCreateDBRequest, PlanDBResponse, PlanUpdateDBRequest,
        TaskCreateDBRequest, TaskDBResponse,
    },
};
use crate::types::{PlanId, TaskId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing release plans.
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    pub status: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

pub struct ReleasePlans<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ReleasePlans<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert the generated timeline tasks for a plan, preserving order.
    #[instrument(skip(self, tasks), fields(plan_id = %abbrev_uuid(&plan_id), count = tasks.len()), err)]
    pub async fn insert_tasks(&mut self, plan_id: PlanId, tasks: &[TaskCreateDBRequest]) -> Result<Vec<TaskDBResponse>> {
        let mut inserted = Vec::with_capacity(tasks.len());
        for task in tasks {
            let row = sqlx::query_as::<_, TaskDBResponse>(
                r#"
                INSERT INTO release_tasks (id, plan_id, day_offset, due_date, label, channel)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(plan_id)
            .bind(task.day_offset)
            .bind(task.due_date)
            .bind(&task.label)
            .bind(&task.channel)
            .fetch_one(&mut *self.db)
            .await?;
            inserted.push(row);
        }
        Ok(inserted)
    }

    /// Tasks for one plan, in timeline order.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn list_tasks(&mut self, plan_id: PlanId) -> Result<Vec<TaskDBResponse>> {
        let tasks = sqlx::query_as::<_, TaskDBResponse>(
            "SELECT * FROM release_tasks WHERE plan_id = $1 ORDER BY day_offset ASC, created_at ASC",
        )
        .bind(plan_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(tasks)
    }

    /// Replace a plan's timeline: delete existing tasks, the caller re-inserts.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn clear_tasks(&mut self, plan_id: PlanId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM release_tasks WHERE plan_id = $1")
            .bind(plan_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Mark a task done or not done. Returns None when the task does not belong to the plan.
    #[instrument(skip(self), fields(task_id = %abbrev_uuid(&task_id)), err)]
    pub async fn set_task_done(&mut self, plan_id: PlanId, task_id: TaskId, done: bool) -> Result<Option<TaskDBResponse>> {
        let task = sqlx::query_as::<_, TaskDBResponse>(
            "UPDATE release_tasks SET done = $3 WHERE id = $2 AND plan_id = $1 RETURNING *",
        )
        .bind(plan_id)
        .bind(task_id)
        .bind(done)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(task)
    }

    /// Insert or overwrite the copy row for one platform of a plan.
    #[instrument(skip(self, request), fields(plan_id = %abbrev_uuid(&request.plan_id), platform = %request.platform), err)]
    pub async fn upsert_copy(&mut self, request: &CopyUpsertDBRequest) -> Result<CopyDBResponse> {
        let copy = sqlx::query_as::<_, CopyDBResponse>(
            r#"
            INSERT INTO release_copy (id, plan_id, platform, body, model, status, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ON CONSTRAINT release_copy_plan_platform_unique
            DO UPDATE SET
                body = EXCLUDED.body,
                model = EXCLUDED.model,
                status = EXCLUDED.status,
                error = EXCLUDED.error,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.plan_id)
        .bind(&request.platform)
        .bind(&request.body)
        .bind(&request.model)
        .bind(&request.status)
        .bind(&request.error)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(copy)
    }

    /// All copy rows for a plan.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&plan_id)), err)]
    pub async fn list_copy(&mut self, plan_id: PlanId) -> Result<Vec<CopyDBResponse>> {
        let copy = sqlx::query_as::<_, CopyDBResponse>(
            "SELECT * FROM release_copy WHERE plan_id = $1 ORDER BY platform ASC",
        )
        .bind(plan_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(copy)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for ReleasePlans<'c> {
    type CreateRequest = PlanCreateDBRequest;
    type UpdateRequest = PlanUpdateDBRequest;
    type Response = PlanDBResponse;
    type Id = PlanId;
    type Filter = PlanFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let plan = sqlx::query_as::<_, PlanDBResponse>(
            r#"
            INSERT INTO release_plans (id, title, artist, release_date, platforms, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.title)
        .bind(&request.artist)
        .bind(request.release_date)
        .bind(&request.platforms)
        .bind(&request.status)
        .bind(request.created_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(plan)
    }

    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let plan = sqlx::query_as::<_, PlanDBResponse>("SELECT * FROM release_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(plan)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let plans = sqlx::query_as::<_, PlanDBResponse>(
            r#"
            SELECT * FROM release_plans
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY release_date DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(plans)
    }

    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM release_plans WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(&filter.status)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let plan = sqlx::query_as::<_, PlanDBResponse>(
            r#"
            UPDATE release_plans SET
                title = COALESCE($2, title),
                artist = COALESCE($3, artist),
                release_date = COALESCE($4, release_date),
                platforms = COALESCE($5, platforms),
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.artist)
        .bind(request.release_date)
        .bind(&request.platforms)
        .bind(&request.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(plan)
    }

    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM release_plans WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
