//! API models for release plans, timeline tasks, and generated copy.

use crate::db::models::releases::{
    CopyDBResponse, PlanCreateDBRequest, PlanDBResponse, PlanUpdateDBRequest, TaskDBResponse,
};
use crate::errors::Error;
use crate::platforms::Platform;
use crate::types::{PlanId, TaskId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle state of a release plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Planning,
    Ready,
    Archived,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Planning => "planning",
            PlanStatus::Ready => "ready",
            PlanStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(PlanStatus::Planning),
            "ready" => Ok(PlanStatus::Ready),
            "archived" => Ok(PlanStatus::Archived),
            other => Err(Error::BadRequest {
                message: format!("Unknown plan status: {other}"),
            }),
        }
    }
}

/// State of one platform's generated copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Pending,
    Generated,
    Failed,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Pending => "pending",
            CopyStatus::Generated => "generated",
            CopyStatus::Failed => "failed",
        }
    }
}

impl FromStr for CopyStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CopyStatus::Pending),
            "generated" => Ok(CopyStatus::Generated),
            "failed" => Ok(CopyStatus::Failed),
            other => Err(Error::BadRequest {
                message: format!("Unknown copy status: {other}"),
            }),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlanCreate {
    pub title: String,
    pub artist: String,
    pub release_date: NaiveDate,
    /// Social platforms to generate copy for
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

impl PlanCreate {
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Release title is required".to_string(),
            });
        }
        if self.artist.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Artist is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn into_db_request(self, created_by: UserId) -> PlanCreateDBRequest {
        PlanCreateDBRequest {
            title: self.title.trim().to_string(),
            artist: self.artist.trim().to_string(),
            release_date: self.release_date,
            platforms: self.platforms.iter().map(|p| p.as_str().to_string()).collect(),
            status: PlanStatus::Planning.as_str().to_string(),
            created_by: Some(created_by),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PlanUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub platforms: Option<Vec<Platform>>,
    pub status: Option<PlanStatus>,
}

impl From<PlanUpdate> for PlanUpdateDBRequest {
    fn from(api: PlanUpdate) -> Self {
        Self {
            title: api.title,
            artist: api.artist,
            release_date: api.release_date,
            platforms: api
                .platforms
                .map(|ps| ps.iter().map(|p| p.as_str().to_string()).collect()),
            status: api.status.map(|s| s.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    pub id: PlanId,
    pub title: String,
    pub artist: String,
    pub release_date: NaiveDate,
    pub platforms: Vec<Platform>,
    pub status: PlanStatus,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PlanDBResponse> for PlanResponse {
    type Error = Error;

    fn try_from(plan: PlanDBResponse) -> Result<Self, Error> {
        Ok(Self {
            id: plan.id,
            title: plan.title,
            artist: plan.artist,
            release_date: plan.release_date,
            platforms: plan
                .platforms
                .iter()
                .map(|p| p.parse())
                .collect::<Result<Vec<_>, _>>()?,
            status: plan.status.parse()?,
            created_by: plan.created_by,
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    pub id: TaskId,
    pub plan_id: PlanId,
    pub day_offset: i32,
    pub due_date: NaiveDate,
    pub label: String,
    pub channel: String,
    pub done: bool,
}

impl From<TaskDBResponse> for TaskResponse {
    fn from(task: TaskDBResponse) -> Self {
        Self {
            id: task.id,
            plan_id: task.plan_id,
            day_offset: task.day_offset,
            due_date: task.due_date,
            label: task.label,
            channel: task.channel,
            done: task.done,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CopyResponse {
    pub id: Uuid,
    pub plan_id: PlanId,
    pub platform: Platform,
    pub body: Option<String>,
    pub model: Option<String>,
    pub status: CopyStatus,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CopyDBResponse> for CopyResponse {
    type Error = Error;

    fn try_from(copy: CopyDBResponse) -> Result<Self, Error> {
        Ok(Self {
            id: copy.id,
            plan_id: copy.plan_id,
            platform: copy.platform.parse()?,
            body: copy.body,
            model: copy.model,
            status: copy.status.parse()?,
            error: copy.error,
            updated_at: copy.updated_at,
        })
    }
}

/// Full plan detail: the plan, its timeline, and all generated copy.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlanDetailResponse {
    #[serde(flatten)]
    pub plan: PlanResponse,
    pub tasks: Vec<TaskResponse>,
    pub copy: Vec<CopyResponse>,
}

/// Toggle request for one timeline task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskToggleRequest {
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_validation() {
        let plan = PlanCreate {
            title: "Night Drive".to_string(),
            artist: "DJ Cali".to_string(),
            release_date: NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
            platforms: vec![Platform::Instagram],
        };
        assert!(plan.validate().is_ok());

        let no_title = PlanCreate {
            title: "  ".to_string(),
            artist: "DJ Cali".to_string(),
            release_date: NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
            platforms: vec![],
        };
        assert!(no_title.validate().is_err());
    }

    #[test]
    fn test_plan_create_maps_platforms_to_strings() {
        let plan = PlanCreate {
            title: "T".to_string(),
            artist: "A".to_string(),
            release_date: NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
            platforms: vec![Platform::X, Platform::Tiktok],
        };
        let db = plan.into_db_request(Uuid::new_v4());
        assert_eq!(db.platforms, vec!["x", "tiktok"]);
        assert_eq!(db.status, "planning");
    }
}
