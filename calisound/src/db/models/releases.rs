//! Database models for release plans, their task timelines, and generated copy.

use crate::types::{PlanId, TaskId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PlanCreateDBRequest {
    pub title: String,
    pub artist: String,
    pub release_date: NaiveDate,
    pub platforms: Vec<String>,
    pub status: String,
    pub created_by: Option<UserId>,
}

/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PlanUpdateDBRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub platforms: Option<Vec<String>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlanDBResponse {
    pub id: PlanId,
    pub title: String,
    pub artist: String,
    pub release_date: NaiveDate,
    pub platforms: Vec<String>,
    pub status: String,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One timeline task to insert for a plan.
#[derive(Debug, Clone)]
pub struct TaskCreateDBRequest {
    pub plan_id: PlanId,
    pub day_offset: i32,
    pub due_date: NaiveDate,
    pub label: String,
    pub channel: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskDBResponse {
    pub id: TaskId,
    pub plan_id: PlanId,
    pub day_offset: i32,
    pub due_date: NaiveDate,
    pub label: String,
    pub channel: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

/// Upsert request for per-platform promotional copy on a plan.
#[derive(Debug, Clone)]
pub struct CopyUpsertDBRequest {
    pub plan_id: PlanId,
    pub platform: String,
    pub body: Option<String>,
    pub model: Option<String>,
    pub status: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CopyDBResponse {
    pub id: Uuid,
    pub plan_id: PlanId,
    pub platform: String,
    pub body: Option<String>,
    pub model: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
