//! Database models for the admin activity log.

use crate::types::{ActivityLogId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One entry to append to the activity log.
#[derive(Debug, Clone)]
pub struct ActivityCreateDBRequest {
    pub actor_id: Option<UserId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub detail: serde_json::Value,
}

impl ActivityCreateDBRequest {
    pub fn new(actor_id: Option<UserId>, action: &str, entity_type: &str, entity_id: Option<String>) -> Self {
        Self {
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            detail: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ActivityDBResponse {
    pub id: ActivityLogId,
    pub actor_id: Option<UserId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
