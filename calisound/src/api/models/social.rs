//! API models for the social post composer and scheduler.

use crate::db::models::social::{
    JobDBResponse, PostCreateDBRequest, PostDBResponse, PostUpdateDBRequest, VariantDBResponse,
    VariantUpsertDBRequest,
};
use crate::errors::Error;
use crate::platforms::Platform;
use crate::types::{JobId, PlanId, PostId, UserId, VariantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Lifecycle state of a social post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Cancelled,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "scheduled" => Ok(PostStatus::Scheduled),
            "cancelled" => Ok(PostStatus::Cancelled),
            other => Err(Error::BadRequest {
                message: format!("Unknown post status: {other}"),
            }),
        }
    }
}

/// State of one scheduled publish job. Jobs are records only; nothing posts
/// to the actual networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Cancelled,
    Done,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Done => "done",
        }
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "cancelled" => Ok(JobStatus::Cancelled),
            "done" => Ok(JobStatus::Done),
            other => Err(Error::BadRequest {
                message: format!("Unknown job status: {other}"),
            }),
        }
    }
}

/// One platform variant in a create/update request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VariantCreate {
    pub platform: Platform,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub media_aspect_ratio: Option<String>,
    #[serde(default)]
    pub media_count: i32,
}

impl VariantCreate {
    pub fn into_db_request(self, post_id: PostId) -> VariantUpsertDBRequest {
        VariantUpsertDBRequest {
            post_id,
            platform: self.platform.as_str().to_string(),
            body: self.body,
            hashtags: self.hashtags,
            media_aspect_ratio: self.media_aspect_ratio,
            media_count: self.media_count,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostCreate {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub plan_id: Option<PlanId>,
    #[serde(default)]
    pub variants: Vec<VariantCreate>,
}

impl PostCreate {
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Post title is required".to_string(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for variant in &self.variants {
            if !seen.insert(variant.platform) {
                return Err(Error::BadRequest {
                    message: format!("Duplicate variant for platform {}", variant.platform),
                });
            }
        }
        Ok(())
    }

    pub fn into_db_request(&self, created_by: UserId) -> PostCreateDBRequest {
        PostCreateDBRequest {
            plan_id: self.plan_id,
            title: self.title.trim().to_string(),
            body: self.body.clone(),
            status: PostStatus::Draft.as_str().to_string(),
            created_by: Some(created_by),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub status: Option<PostStatus>,
    /// Variants to insert or overwrite, keyed by platform
    #[serde(default)]
    pub variants: Vec<VariantCreate>,
}

impl From<&PostUpdate> for PostUpdateDBRequest {
    fn from(api: &PostUpdate) -> Self {
        Self {
            title: api.title.clone(),
            body: api.body.clone(),
            status: api.status.map(|s| s.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantResponse {
    pub id: VariantId,
    pub post_id: PostId,
    pub platform: Platform,
    pub body: String,
    pub hashtags: Vec<String>,
    pub media_aspect_ratio: Option<String>,
    pub media_count: i32,
}

impl TryFrom<VariantDBResponse> for VariantResponse {
    type Error = Error;

    fn try_from(variant: VariantDBResponse) -> Result<Self, Error> {
        Ok(Self {
            id: variant.id,
            post_id: variant.post_id,
            platform: variant.platform.parse()?,
            body: variant.body,
            hashtags: variant.hashtags,
            media_aspect_ratio: variant.media_aspect_ratio,
            media_count: variant.media_count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: PostId,
    pub plan_id: Option<PlanId>,
    pub title: String,
    pub body: String,
    pub status: PostStatus,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PostDBResponse> for PostResponse {
    type Error = Error;

    fn try_from(post: PostDBResponse) -> Result<Self, Error> {
        Ok(Self {
            id: post.id,
            plan_id: post.plan_id,
            title: post.title,
            body: post.body,
            status: post.status.parse()?,
            created_by: post.created_by,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }
}

/// Post with its variants.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub variants: Vec<VariantResponse>,
}

/// Violations for one variant, from the validation endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VariantViolations {
    pub platform: Platform,
    pub issues: Vec<String>,
}

/// Validation outcome across all variants of a post.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<VariantViolations>,
}

/// Request to schedule a post.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    pub id: JobId,
    pub post_id: PostId,
    pub platform: Platform,
    pub scheduled_at: DateTime<Utc>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<JobDBResponse> for JobResponse {
    type Error = Error;

    fn try_from(job: JobDBResponse) -> Result<Self, Error> {
        Ok(Self {
            id: job.id,
            post_id: job.post_id,
            platform: job.platform.parse()?,
            scheduled_at: job.scheduled_at,
            status: job.status.parse()?,
            created_at: job.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(platform: Platform) -> VariantCreate {
        VariantCreate {
            platform,
            body: "hello".to_string(),
            hashtags: vec![],
            media_aspect_ratio: None,
            media_count: 0,
        }
    }

    #[test]
    fn test_duplicate_platforms_rejected() {
        let post = PostCreate {
            title: "Drop".to_string(),
            body: String::new(),
            plan_id: None,
            variants: vec![variant(Platform::X), variant(Platform::X)],
        };
        assert!(post.validate().is_err());

        let post = PostCreate {
            title: "Drop".to_string(),
            body: String::new(),
            plan_id: None,
            variants: vec![variant(Platform::X), variant(Platform::Instagram)],
        };
        assert!(post.validate().is_ok());
    }

    #[test]
    fn test_new_posts_start_as_drafts() {
        let post = PostCreate {
            title: "Drop".to_string(),
            body: String::new(),
            plan_id: None,
            variants: vec![],
        };
        let db = post.into_db_request(uuid::Uuid::new_v4());
        assert_eq!(db.status, "draft");
    }
}
